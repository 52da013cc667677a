// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Proximity to the selected restaurant.
//!
//! Proximity is derived state: a pure function of the current location and
//! the current destination, recomputed on read. There is no buffering, so a
//! reader always sees the state matching the latest inputs.

use crate::models::{LocationSample, Restaurant};
use crate::services::geo_math;
use serde::Serialize;
use tokio::sync::watch;

/// Default "at the restaurant" radius.
pub const NEAR_THRESHOLD_METERS: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityState {
    /// `None` when either the location or the destination is missing
    pub distance_meters: Option<f64>,
    pub is_near: bool,
}

impl ProximityState {
    pub const UNKNOWN: ProximityState = ProximityState {
        distance_meters: None,
        is_near: false,
    };

    pub fn compute(
        sample: Option<&LocationSample>,
        destination: Option<&Restaurant>,
        threshold_meters: f64,
    ) -> Self {
        match (sample, destination) {
            (Some(sample), Some(destination)) => {
                let distance =
                    geo_math::distance_meters(&sample.coordinate, &destination.coordinate);
                Self {
                    distance_meters: Some(distance),
                    is_near: distance <= threshold_meters,
                }
            }
            _ => Self::UNKNOWN,
        }
    }
}

/// Read-only view over the location and destination cells.
#[derive(Clone)]
pub struct ProximityTracker {
    location: watch::Receiver<Option<LocationSample>>,
    destination: watch::Receiver<Option<Restaurant>>,
    threshold_meters: f64,
}

impl ProximityTracker {
    pub fn new(
        location: watch::Receiver<Option<LocationSample>>,
        destination: watch::Receiver<Option<Restaurant>>,
        threshold_meters: f64,
    ) -> Self {
        Self {
            location,
            destination,
            threshold_meters,
        }
    }

    /// Proximity for the inputs as they are right now.
    pub fn current(&self) -> ProximityState {
        let location = self.location.borrow();
        let destination = self.destination.borrow();
        ProximityState::compute(
            location.as_ref(),
            destination.as_ref(),
            self.threshold_meters,
        )
    }

    /// Wait until either input changes and return the recomputed state.
    ///
    /// Returns `None` once both input cells are gone.
    pub async fn next_change(&mut self) -> Option<ProximityState> {
        tokio::select! {
            changed = self.location.changed() => {
                if changed.is_err() {
                    self.destination.changed().await.ok()?;
                }
            }
            changed = self.destination.changed() => {
                if changed.is_err() {
                    self.location.changed().await.ok()?;
                }
            }
        }
        // Both inputs are reflected in the recomputed state.
        let _ = self.location.borrow_and_update();
        let _ = self.destination.borrow_and_update();
        Some(self.current())
    }
}
