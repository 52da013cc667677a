// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user session: wires the services together.
//!
//! The watcher feeds both the proximity tracker and the nearby fetcher; the
//! step sync runs on its own timer. Each piece of shared state has one
//! writer: the watcher owns the location, the session owns the destination.
//! Signing in (again) or out tears everything down first so nothing from a
//! previous user survives into the next session.
//!
//! Every teardown starts a new epoch. Operations capture the epoch before
//! awaiting the backend and discard their result if it moved, so a reply
//! that lands after logout never touches the next user's state.

use crate::config::Config;
use crate::db::{SessionStore, StoredSession};
use crate::error::{AppError, Result};
use crate::models::{
    Directions, LocationSample, PointsBalance, RedemptionReceipt, Restaurant, Reward,
};
use crate::services::backend::{CheckInResponse, RewardsBackend};
use crate::services::check_in::{self, CheckInDecision, RedemptionDecision, CHECK_IN_POINTS};
use crate::services::geo_math;
use crate::services::location::{LocationProvider, LocationWatcher, WatchOptions};
use crate::services::nearby::{NearbyPlaces, NearbyPlacesFetcher, NearbySettings};
use crate::services::notifications::Notifier;
use crate::services::points_policy::{self, RestaurantBonus};
use crate::services::proximity::{ProximityState, ProximityTracker};
use crate::services::step_sync::{HealthDataProvider, StepSyncScheduler, SyncOutcome};
use crate::time_utils::Clock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// External collaborators, injected once at startup.
pub struct Services {
    pub backend: Arc<dyn RewardsBackend>,
    pub location: Arc<dyn LocationProvider>,
    /// `None` on platforms without health integration.
    pub health: Option<Arc<dyn HealthDataProvider>>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
}

/// Result of a check-in attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CheckInOutcome {
    CheckedIn {
        restaurant_id: String,
        points_awarded: u64,
        check_ins_today: u32,
    },
    NoDestination,
    NotNear {
        distance_meters: Option<f64>,
    },
    /// Terminal for today; distinct from a transient failure (`Err`).
    DailyLimitReached,
}

/// Result of a redemption attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RedemptionOutcome {
    /// Accepted by the backend. The local balance is provisional until the
    /// next `refresh_balance`.
    Redeemed(RedemptionReceipt),
    InsufficientPoints { short_by: u64 },
    RedemptionCapReached,
}

/// What walking to the selected restaurant is worth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyEstimate {
    pub distance_meters: f64,
    pub steps: u64,
    /// Tiered proportional points for the walk's steps
    pub step_points: u64,
    pub bonus: RestaurantBonus,
    /// Whether the distance follows the fetched route or is straight-line
    pub from_route: bool,
}

pub struct Session {
    backend: Arc<dyn RewardsBackend>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    watcher: LocationWatcher,
    destination: watch::Sender<Option<Restaurant>>,
    proximity: ProximityTracker,
    nearby: Arc<NearbyPlacesFetcher>,
    step_sync: Arc<StepSyncScheduler>,
    balance: Mutex<PointsBalance>,
    directions: Mutex<Option<Directions>>,
    user_id: Mutex<Option<String>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    epoch: AtomicU64,
}

impl Session {
    pub fn new(config: &Config, services: Services) -> Self {
        let watcher = LocationWatcher::new(
            services.location,
            services.clock.clone(),
            WatchOptions::from_config(config),
        );
        let (destination, destination_rx) = watch::channel(None);
        let proximity = ProximityTracker::new(
            watcher.subscribe(),
            destination_rx,
            config.near_threshold_meters,
        );
        let nearby = Arc::new(NearbyPlacesFetcher::new(
            services.backend.clone(),
            NearbySettings::from_config(config),
        ));
        let step_sync = Arc::new(StepSyncScheduler::new(
            services.health,
            services.backend.clone(),
            services.notifier,
            services.clock.clone(),
            config.step_sync_interval,
        ));

        Self {
            backend: services.backend,
            store: services.store,
            clock: services.clock,
            watcher,
            destination,
            proximity,
            nearby,
            step_sync,
            balance: Mutex::new(PointsBalance::default()),
            directions: Mutex::new(None),
            user_id: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            epoch: AtomicU64::new(0),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Sign in and start every per-user service.
    ///
    /// A `PermissionDenied` (or other location failure) is returned after
    /// everything else has started: the user stays signed in without
    /// location features until [`Session::start_location`] succeeds.
    pub async fn login(&self, session: StoredSession) -> Result<()> {
        self.teardown();
        let epoch = self.epoch();

        self.backend.set_auth_token(Some(session.user_token.clone()));
        self.store.set(&session).await?;
        {
            let mut user_id = self.user_id.lock().unwrap_or_else(|e| e.into_inner());
            self.ensure_epoch(epoch)?;
            *user_id = Some(session.user_id.clone());
        }
        tracing::info!(user_id = %session.user_id, "Session started");

        self.step_sync.start();
        if let Err(e) = self.refresh_balance().await {
            tracing::warn!(error = %e, "Initial balance fetch failed");
        }
        self.ensure_epoch(epoch)?;

        self.start_location().await
    }

    /// Log in from stored credentials. Returns `false` if none were stored.
    pub async fn restore(&self) -> Result<bool> {
        match self.store.get().await? {
            Some(session) => {
                tracing::info!(user_id = %session.user_id, "Restoring stored session");
                self.login(session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// (Re)start the location watcher and the tasks that consume it.
    pub async fn start_location(&self) -> Result<()> {
        self.stop_tasks();
        let epoch = self.epoch();
        self.watcher.start().await?;

        let mut samples = self.watcher.subscribe();
        let nearby = self.nearby.clone();
        let pump = tokio::spawn(async move {
            loop {
                let coordinate = samples.borrow_and_update().as_ref().map(|s| s.coordinate);
                if let Some(coordinate) = coordinate {
                    nearby.on_location(coordinate);
                }
                if samples.changed().await.is_err() {
                    break;
                }
            }
        });

        let mut tracker = self.proximity.clone();
        let observer = tokio::spawn(async move {
            let mut was_near = tracker.current().is_near;
            while let Some(state) = tracker.next_change().await {
                if state.is_near != was_near {
                    tracing::info!(
                        near = state.is_near,
                        distance_m = ?state.distance_meters,
                        "Proximity changed"
                    );
                    was_near = state.is_near;
                }
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = self.ensure_epoch(epoch) {
            pump.abort();
            observer.abort();
            return Err(e);
        }
        tasks.extend([pump, observer]);
        Ok(())
    }

    /// Sign out and forget the stored credentials.
    pub async fn logout(&self) -> Result<()> {
        self.teardown();
        self.store.remove().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Release watchers and timers (app teardown). Stored credentials stay
    /// so the next launch can restore the session.
    pub fn shutdown(&self) {
        self.teardown();
        tracing::info!("Session shut down");
    }

    fn stop_tasks(&self) {
        self.watcher.stop();
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
        {
            task.abort();
        }
    }

    /// Stop everything and clear all per-user state.
    fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.stop_tasks();
        self.watcher.clear();
        self.step_sync.reset();
        self.nearby.reset();
        self.destination.send_replace(None);
        *self.directions.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.balance.lock().unwrap_or_else(|e| e.into_inner()) = PointsBalance::default();
        self.backend.set_auth_token(None);
        *self.user_id.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Fails with `StaleRequestDiscarded` if a teardown ran since `epoch`.
    fn ensure_epoch(&self, epoch: u64) -> Result<()> {
        if self.epoch() != epoch {
            tracing::debug!("Session ended while waiting, dropping result");
            return Err(AppError::StaleRequestDiscarded);
        }
        Ok(())
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn watcher(&self) -> &LocationWatcher {
        &self.watcher
    }

    // ─── Location & destination ──────────────────────────────────────────────

    pub fn location(&self) -> Option<LocationSample> {
        self.watcher.latest()
    }

    pub fn destination(&self) -> Option<Restaurant> {
        self.destination.borrow().clone()
    }

    /// Select a restaurant to walk to. Replaces any previous selection and
    /// drops directions computed for it.
    pub fn select_destination(&self, restaurant: Restaurant) {
        tracing::info!(restaurant_id = %restaurant.id, name = %restaurant.name, "Destination selected");
        *self.directions.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.destination.send_replace(Some(restaurant));
    }

    pub fn clear_destination(&self) {
        *self.directions.lock().unwrap_or_else(|e| e.into_inner()) = None;
        if self.destination.send_replace(None).is_some() {
            tracing::debug!("Destination cleared");
        }
    }

    pub fn proximity(&self) -> ProximityState {
        self.proximity.current()
    }

    pub fn nearby(&self) -> NearbyPlaces {
        self.nearby.places()
    }

    pub fn nearby_fetcher(&self) -> &Arc<NearbyPlacesFetcher> {
        &self.nearby
    }

    // ─── Directions ──────────────────────────────────────────────────────────

    /// Fetch walking directions from the current location to the selected
    /// restaurant. `None` when nothing is selected.
    pub async fn fetch_directions(&self) -> Result<Option<Directions>> {
        let Some(destination) = self.destination() else {
            return Ok(None);
        };
        let epoch = self.epoch();

        let origin = match self.location() {
            Some(sample) => sample.coordinate,
            None => self.watcher.current_position().await?,
        };

        let directions = self
            .backend
            .directions(origin, destination.coordinate)
            .await?;

        let mut current = self.directions.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_epoch(epoch)?;
        // The selection may have changed while we were waiting.
        if self.destination().map(|d| d.id) != Some(destination.id.clone()) {
            tracing::debug!(restaurant_id = %destination.id, "Dropping directions for stale destination");
            return Ok(None);
        }

        tracing::info!(
            restaurant_id = %destination.id,
            steps = directions.steps.len(),
            "Directions fetched"
        );
        *current = Some(directions.clone());
        Ok(Some(directions))
    }

    pub fn directions(&self) -> Option<Directions> {
        self.directions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Points the user would earn by walking to the selected restaurant.
    ///
    /// Uses the route length when directions are loaded, else the
    /// straight-line distance from the current location.
    pub fn journey_estimate(&self) -> Result<Option<JourneyEstimate>> {
        let route_length = self
            .directions()
            .map(|d| d.length_meters())
            .transpose()?;

        let (distance_meters, from_route) = match route_length {
            Some(length) => (length, true),
            None => match self.proximity().distance_meters {
                Some(distance) => (distance, false),
                None => return Ok(None),
            },
        };

        let steps = geo_math::steps_for_distance(distance_meters)?;
        Ok(Some(JourneyEstimate {
            distance_meters,
            steps,
            step_points: points_policy::steps_to_points(steps),
            bonus: points_policy::apply_restaurant_bonus(steps, distance_meters),
            from_route,
        }))
    }

    // ─── Check-in ────────────────────────────────────────────────────────────

    /// Check in at the selected restaurant.
    ///
    /// Eligibility is decided from the proximity at the time of the call and
    /// today's count from the backend. On success the award is credited
    /// locally (provisional) and the destination and directions are cleared.
    pub async fn check_in(&self) -> Result<CheckInOutcome> {
        let Some(destination) = self.destination() else {
            return Ok(CheckInOutcome::NoDestination);
        };

        let proximity = self.proximity();
        if !proximity.is_near {
            return Ok(CheckInOutcome::NotNear {
                distance_meters: proximity.distance_meters,
            });
        }

        let epoch = self.epoch();
        let today = self.clock.today();
        let record = self.backend.check_in_count(&destination.id, today).await?;
        self.ensure_epoch(epoch)?;
        let count = record.count;

        // Re-read proximity: the user may have walked off while we waited.
        let proximity = self.proximity();
        match check_in::evaluate_check_in(&proximity, count) {
            CheckInDecision::Allowed => {}
            CheckInDecision::NotNear => {
                return Ok(CheckInOutcome::NotNear {
                    distance_meters: proximity.distance_meters,
                })
            }
            CheckInDecision::DailyLimitReached => {
                tracing::info!(restaurant_id = %destination.id, count, "Daily check-in limit reached");
                return Ok(CheckInOutcome::DailyLimitReached);
            }
        }

        let Some(at) = self.location().map(|s| s.coordinate) else {
            return Ok(CheckInOutcome::NotNear {
                distance_meters: None,
            });
        };

        match self.backend.post_check_in(&destination.id, at).await? {
            CheckInResponse::DailyLimitReached => {
                tracing::info!(restaurant_id = %destination.id, "Backend refused check-in: daily limit");
                Ok(CheckInOutcome::DailyLimitReached)
            }
            CheckInResponse::Accepted(receipt) => {
                {
                    let mut balance = self.balance.lock().unwrap_or_else(|e| e.into_inner());
                    self.ensure_epoch(epoch)?;
                    balance.credit(CHECK_IN_POINTS);
                }
                self.clear_destination();

                tracing::info!(
                    restaurant_id = %destination.id,
                    points = CHECK_IN_POINTS,
                    count_today = receipt.count_today,
                    "Checked in"
                );
                Ok(CheckInOutcome::CheckedIn {
                    restaurant_id: destination.id,
                    points_awarded: CHECK_IN_POINTS,
                    check_ins_today: receipt.count_today,
                })
            }
        }
    }

    // ─── Points & rewards ────────────────────────────────────────────────────

    pub fn balance(&self) -> PointsBalance {
        *self.balance.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the local balance with the backend's.
    pub async fn refresh_balance(&self) -> Result<PointsBalance> {
        let epoch = self.epoch();
        let remote = self.backend.points_balance().await?;
        let mut balance = self.balance.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_epoch(epoch)?;
        balance.confirm(remote.total);
        Ok(*balance)
    }

    /// Rewards that have not expired.
    pub async fn rewards(&self) -> Result<Vec<Reward>> {
        let today = self.clock.today();
        let rewards = self.backend.list_rewards().await?;
        Ok(rewards
            .into_iter()
            .filter(|r| r.expiration_date.map_or(true, |d| d >= today))
            .collect())
    }

    /// Redeem `reward` if the local balance and redemption cap allow it.
    pub async fn redeem(&self, reward: &Reward) -> Result<RedemptionOutcome> {
        let points = self.balance().total;
        match check_in::evaluate_redemption(points, reward) {
            RedemptionDecision::Allowed => {}
            RedemptionDecision::InsufficientPoints { short_by } => {
                return Ok(RedemptionOutcome::InsufficientPoints { short_by })
            }
            RedemptionDecision::RedemptionCapReached => {
                return Ok(RedemptionOutcome::RedemptionCapReached)
            }
        }

        let epoch = self.epoch();
        let receipt = self.backend.redeem_reward(&reward.id).await?;
        {
            let mut balance = self.balance.lock().unwrap_or_else(|e| e.into_inner());
            self.ensure_epoch(epoch)?;
            balance.debit_provisional(reward.points_required);
        }

        tracing::info!(
            reward_id = %reward.id,
            points = reward.points_required,
            "Reward redeemed"
        );
        Ok(RedemptionOutcome::Redeemed(receipt))
    }

    // ─── Steps ───────────────────────────────────────────────────────────────

    /// App came back to the foreground: sync steps once.
    pub async fn on_foreground(&self) -> Result<SyncOutcome> {
        self.step_sync.on_foreground().await
    }

    pub fn step_sync(&self) -> &Arc<StepSyncScheduler> {
        &self.step_sync
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_tasks();
        self.step_sync.stop();
        self.nearby.reset();
    }
}
