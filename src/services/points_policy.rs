// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Step-to-points conversion rules.
//!
//! Two independent scales exist: `steps_to_points` is the tiered
//! proportional rate, `daily_step_points` the per-1000-step milestone rate
//! that restaurant bonuses build on.

use serde::Serialize;

/// Flat bonus for completing a walk to a restaurant.
pub const COMPLETION_BONUS_POINTS: u64 = 25;

/// One mile, two miles and three miles in meters.
const BONUS_TIERS: [(f64, f64); 3] = [(4827.0, 3.0), (3218.0, 2.0), (1609.0, 1.5)];

/// Tiered conversion, evaluated against the total step count.
///
/// The rate jumps at 1000 and 5000 steps; it is not summed per tier.
pub fn steps_to_points(steps: u64) -> u64 {
    match steps {
        0..=1000 => steps / 100,
        1001..=5000 => steps / 80,
        _ => steps / 50,
    }
}

/// Ten points per full thousand steps.
pub fn daily_step_points(steps_today: u64) -> u64 {
    (steps_today / 1000) * 10
}

/// Points for walking to a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantBonus {
    /// `daily_step_points(steps)` scaled by the distance multiplier
    pub total_points: u64,
    /// Flat completion bonus, independent of the multiplier
    pub bonus_points: u64,
}

/// Distance multiplier: the highest tier reached wins, tiers don't stack.
/// Anything that isn't a distance of at least one mile gets 1x.
pub fn distance_multiplier(distance_meters: f64) -> f64 {
    BONUS_TIERS
        .iter()
        .find(|(threshold, _)| distance_meters >= *threshold)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(1.0)
}

pub fn apply_restaurant_bonus(steps: u64, distance_meters: f64) -> RestaurantBonus {
    let multiplier = distance_multiplier(distance_meters);
    let total_points = (daily_step_points(steps) as f64 * multiplier).floor() as u64;

    RestaurantBonus {
        total_points,
        bonus_points: COMPLETION_BONUS_POINTS,
    }
}
