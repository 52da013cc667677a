// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coordinates, location samples and location buckets.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Approximate length of one degree of latitude.
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A WGS-84 position in decimal degrees.
///
/// Always valid: both components finite, latitude in [-90, 90] and
/// longitude in [-180, 180]. Deserialization runs the same checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(AppError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = AppError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl From<Coordinate> for RawCoordinate {
    fn from(c: Coordinate) -> Self {
        Self {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        // geo uses x = longitude, y = latitude
        geo::Point::new(c.longitude, c.latitude)
    }
}

impl TryFrom<geo::Coord<f64>> for Coordinate {
    type Error = AppError;

    fn try_from(c: geo::Coord<f64>) -> Result<Self, Self::Error> {
        Coordinate::new(c.y, c.x)
    }
}

/// One reading from the location watcher. Superseded by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    /// Degrees clockwise from north, when the platform knows it
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Grid cell used to decide whether the user moved "far enough" to warrant
/// a new nearby-places lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationBucket {
    pub lat_index: i64,
    pub lon_index: i64,
}

impl LocationBucket {
    /// Bucket containing `coord` for a grid of roughly `cell_meters` cells.
    ///
    /// Longitude cells widen toward the poles so cells stay roughly square.
    pub fn from_coordinate(coord: Coordinate, cell_meters: f64) -> Self {
        let cell_deg = (cell_meters / METERS_PER_DEGREE_LAT).max(1e-6);
        let lat_index = (coord.latitude / cell_deg).floor() as i64;

        // Use the row center so every point in a row shares one width.
        let row_center = (lat_index as f64 + 0.5) * cell_deg;
        let lon_cell = cell_deg / row_center.to_radians().cos().max(0.01);
        let lon_index = (coord.longitude / lon_cell).floor() as i64;

        Self {
            lat_index,
            lon_index,
        }
    }
}
