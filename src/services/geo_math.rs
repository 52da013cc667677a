// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Distance and step-count math.

use crate::error::AppError;
use crate::models::Coordinate;
use geo::{Distance, Haversine};

/// Average walking stride used to turn distance into steps.
pub const AVERAGE_STEP_LENGTH_METERS: f64 = 0.7;

/// Great-circle (haversine) distance in meters.
///
/// Symmetric in its arguments and exactly zero for identical points.
/// `Coordinate` is validated at construction, so this cannot produce NaN.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    Haversine.distance(geo::Point::from(*a), geo::Point::from(*b))
}

/// Estimated steps to cover `distance_meters` on foot.
pub fn steps_for_distance(distance_meters: f64) -> Result<u64, AppError> {
    if !distance_meters.is_finite() || distance_meters < 0.0 {
        return Err(AppError::InvalidDistance(distance_meters));
    }
    Ok((distance_meters / AVERAGE_STEP_LENGTH_METERS).round() as u64)
}
