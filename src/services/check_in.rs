// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in and redemption eligibility.
//!
//! Both policies return plain decisions. A refusal is an expected business
//! outcome, so it is a value here and never an `AppError`.

use crate::models::Reward;
use crate::services::proximity::ProximityState;
use serde::Serialize;

/// Check-ins allowed per restaurant per day.
pub const MAX_CHECK_INS_PER_DAY: u32 = 2;

/// Points awarded for a successful check-in.
pub const CHECK_IN_POINTS: u64 = 25;

/// Times a single reward can be redeemed.
pub const MAX_REDEMPTIONS_PER_REWARD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInDecision {
    Allowed,
    /// Not within the proximity threshold (or no location/destination).
    NotNear,
    DailyLimitReached,
}

pub fn has_reached_daily_limit(check_ins_today: u32) -> bool {
    check_ins_today >= MAX_CHECK_INS_PER_DAY
}

/// Decide whether the user may check in right now.
///
/// Proximity is checked first, so a user who is far away and already at the
/// cap is told they are not near.
pub fn evaluate_check_in(proximity: &ProximityState, check_ins_today: u32) -> CheckInDecision {
    if !proximity.is_near {
        CheckInDecision::NotNear
    } else if has_reached_daily_limit(check_ins_today) {
        CheckInDecision::DailyLimitReached
    } else {
        CheckInDecision::Allowed
    }
}

pub fn can_check_in(proximity: &ProximityState, check_ins_today: u32) -> bool {
    evaluate_check_in(proximity, check_ins_today) == CheckInDecision::Allowed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RedemptionDecision {
    Allowed,
    InsufficientPoints { short_by: u64 },
    RedemptionCapReached,
}

/// Decide whether `reward` can be redeemed with `user_points`.
///
/// This only gates the UI; the backend performs the authoritative deduction.
pub fn evaluate_redemption(user_points: u64, reward: &Reward) -> RedemptionDecision {
    if reward.redemptions_count >= MAX_REDEMPTIONS_PER_REWARD {
        RedemptionDecision::RedemptionCapReached
    } else if user_points < reward.points_required {
        RedemptionDecision::InsufficientPoints {
            short_by: reward.points_required - user_points,
        }
    } else {
        RedemptionDecision::Allowed
    }
}

pub fn can_redeem(user_points: u64, reward: &Reward) -> bool {
    evaluate_redemption(user_points, reward) == RedemptionDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEAR: ProximityState = ProximityState {
        distance_meters: Some(20.0),
        is_near: true,
    };
    const FAR: ProximityState = ProximityState {
        distance_meters: Some(900.0),
        is_near: false,
    };

    fn reward(points_required: u64, redemptions_count: u32) -> Reward {
        Reward {
            id: "reward-1".to_string(),
            title: "Free coffee".to_string(),
            points_required,
            expiration_date: None,
            redemptions_count,
        }
    }

    #[test]
    fn test_not_near_blocks_regardless_of_count() {
        for count in 0..5 {
            assert!(!can_check_in(&FAR, count));
            assert_eq!(evaluate_check_in(&FAR, count), CheckInDecision::NotNear);
        }
        assert!(!can_check_in(&ProximityState::UNKNOWN, 0));
    }

    #[test]
    fn test_daily_limit_blocks_regardless_of_proximity() {
        assert!(!can_check_in(&NEAR, MAX_CHECK_INS_PER_DAY));
        assert!(!can_check_in(&NEAR, MAX_CHECK_INS_PER_DAY + 1));
        assert_eq!(
            evaluate_check_in(&NEAR, MAX_CHECK_INS_PER_DAY),
            CheckInDecision::DailyLimitReached
        );
        assert!(!can_check_in(&FAR, MAX_CHECK_INS_PER_DAY));
    }

    #[test]
    fn test_allowed_when_near_and_under_limit() {
        assert!(can_check_in(&NEAR, 0));
        assert!(can_check_in(&NEAR, MAX_CHECK_INS_PER_DAY - 1));
    }

    #[test]
    fn test_redemption_rules() {
        assert!(can_redeem(100, &reward(100, 0)));
        assert!(can_redeem(150, &reward(100, 2)));
        assert_eq!(
            evaluate_redemption(60, &reward(100, 0)),
            RedemptionDecision::InsufficientPoints { short_by: 40 }
        );
        assert_eq!(
            evaluate_redemption(1000, &reward(100, 3)),
            RedemptionDecision::RedemptionCapReached
        );
    }
}
