// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redeemable rewards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A reward the user can exchange points for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub title: String,
    /// Points needed to redeem
    pub points_required: u64,
    /// Last day the reward can be redeemed
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    /// Times this user has already redeemed it
    #[serde(default)]
    pub redemptions_count: u32,
}

/// Backend acknowledgement of a redemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionReceipt {
    pub reward_id: String,
    /// Balance after the server-side deduction
    pub remaining_points: u64,
}
