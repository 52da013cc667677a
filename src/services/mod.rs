// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod backend;
pub mod check_in;
pub mod debounce;
pub mod geo_math;
pub mod location;
pub mod nearby;
pub mod notifications;
pub mod points_policy;
pub mod proximity;
pub mod step_sync;

pub use backend::{CheckInReceipt, CheckInResponse, HttpBackend, RewardsBackend, StepSyncRequest};
pub use check_in::{CheckInDecision, RedemptionDecision};
pub use debounce::Debouncer;
pub use location::{
    LocationProvider, LocationWatcher, PermissionStatus, PositionFix, ReplayLocationProvider,
    WatchOptions, WatcherState,
};
pub use nearby::{NearbyPlaces, NearbyPlacesFetcher, NearbySettings};
pub use notifications::{LogNotifier, Notification, Notifier};
pub use points_policy::RestaurantBonus;
pub use proximity::{ProximityState, ProximityTracker};
pub use step_sync::{DateRange, HealthDataProvider, StepSyncScheduler, SyncOutcome};
