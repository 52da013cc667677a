// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod directions;
pub mod geo;
pub mod points;
pub mod restaurant;
pub mod reward;

pub use directions::{DirectionStep, Directions};
pub use geo::{Coordinate, LocationBucket, LocationSample};
pub use points::{CheckInRecord, PointsBalance, StepRecord};
pub use restaurant::Restaurant;
pub use reward::{RedemptionReceipt, Reward};
