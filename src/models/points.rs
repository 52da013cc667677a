// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Step records, check-in records and the points balance.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Steps walked on one calendar day and the points they earned.
///
/// The backend owns the authoritative copy; the local one is a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Calendar day (ISO 8601 date)
    pub date: NaiveDate,
    /// Cumulative steps for the day
    pub step_count: u64,
    /// Points for the day's cumulative steps
    pub points_earned: u64,
}

/// Check-ins at one restaurant on one day. The backend owns the count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub restaurant_id: String,
    pub date: NaiveDate,
    pub count: u32,
}

/// The user's points balance.
///
/// `provisional` is set whenever the local total was adjusted without the
/// backend confirming it; the next successful fetch clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBalance {
    pub total: u64,
    #[serde(skip)]
    pub provisional: bool,
}

impl PointsBalance {
    /// Confirmed balance as reported by the backend.
    pub fn confirmed(total: u64) -> Self {
        Self {
            total,
            provisional: false,
        }
    }

    /// Add an award locally, pending confirmation.
    pub fn credit(&mut self, points: u64) {
        self.total = self.total.saturating_add(points);
        self.provisional = true;
    }

    /// Deduct a redemption locally, pending confirmation.
    ///
    /// Never goes below zero; callers gate on sufficiency first.
    pub fn debit_provisional(&mut self, points: u64) {
        self.total = self.total.saturating_sub(points);
        self.provisional = true;
    }

    /// Replace with the backend's authoritative total.
    pub fn confirm(&mut self, total: u64) {
        self.total = total;
        self.provisional = false;
    }
}
