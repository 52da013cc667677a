// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Rewards-Tracker: walk to restaurants, earn points.
//!
//! This crate provides the client-side engine of a loyalty app: it tracks
//! the user's location, works out proximity to a selected restaurant,
//! turns steps into points, debounces nearby-restaurant lookups and
//! enforces check-in and redemption rules.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod time_utils;

pub use session::{CheckInOutcome, JourneyEstimate, RedemptionOutcome, Services, Session};
