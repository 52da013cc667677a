// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turn-by-turn directions between two coordinates.

use crate::error::AppError;
use crate::models::Coordinate;
use crate::services::geo_math;
use serde::{Deserialize, Serialize};

/// Route returned by the directions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directions {
    /// Encoded polyline (precision 5)
    pub polyline: String,
    /// Step-by-step instructions
    #[serde(default)]
    pub steps: Vec<DirectionStep>,
    /// Route length reported by the backend, meters
    #[serde(default)]
    pub distance_meters: Option<f64>,
    /// Expected walking time, seconds
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

/// A single maneuver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionStep {
    pub instruction: String,
    pub distance_meters: f64,
}

impl Directions {
    /// Decode the route polyline into coordinates.
    pub fn path(&self) -> Result<Vec<Coordinate>, AppError> {
        let line = polyline::decode_polyline(&self.polyline, 5).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to decode polyline: {}", e))
        })?;

        line.0.into_iter().map(Coordinate::try_from).collect()
    }

    /// Route length: the backend's figure when present, otherwise the sum of
    /// the decoded path's great-circle legs.
    pub fn length_meters(&self) -> Result<f64, AppError> {
        if let Some(d) = self.distance_meters.filter(|d| d.is_finite() && *d >= 0.0) {
            return Ok(d);
        }

        let path = self.path()?;
        Ok(path
            .windows(2)
            .map(|leg| geo_math::distance_meters(&leg[0], &leg[1]))
            .sum())
    }
}
