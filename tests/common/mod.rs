// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fakes for the platform and backend seams.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rewards_tracker::config::Config;
use rewards_tracker::db::MemorySessionStore;
use rewards_tracker::error::{AppError, NetworkError, Result};
use rewards_tracker::models::{
    CheckInRecord, Coordinate, Directions, PointsBalance, RedemptionReceipt, Restaurant, Reward,
    StepRecord,
};
use rewards_tracker::services::{
    CheckInReceipt, CheckInResponse, DateRange, HealthDataProvider, LocationProvider,
    Notification, Notifier, PermissionStatus, PositionFix, RewardsBackend, StepSyncRequest,
    WatchOptions,
};
use rewards_tracker::time_utils::ManualClock;
use rewards_tracker::Services;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// 2024-05-01 12:00 UTC
#[allow(dead_code)]
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ))
}

#[allow(dead_code)]
pub fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).unwrap()
}

#[allow(dead_code)]
pub fn restaurant(id: &str, coordinate: Coordinate) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: format!("Restaurant {}", id),
        coordinate,
        address: None,
        cuisine: None,
        rating: None,
    }
}

#[allow(dead_code)]
pub fn reward(id: &str, points_required: u64) -> Reward {
    Reward {
        id: id.to_string(),
        title: format!("Reward {}", id),
        points_required,
        expiration_date: None,
        redemptions_count: 0,
    }
}

fn backend_error(status: u16) -> AppError {
    AppError::Network(NetworkError::Status {
        status,
        body: String::new(),
    })
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// How the fake answers one nearby lookup.
#[allow(dead_code)]
pub enum NearbyReply {
    Now(Vec<Restaurant>),
    /// Resolves when the test sends on the paired sender.
    Later(oneshot::Receiver<Vec<Restaurant>>),
    Fail(u16),
}

#[derive(Default)]
pub struct FakeBackend {
    pub token: Mutex<Option<String>>,
    pub nearby_replies: Mutex<VecDeque<NearbyReply>>,
    /// Answer once the queue is empty.
    pub nearby_default: Mutex<Vec<Restaurant>>,
    pub nearby_calls: Mutex<Vec<Coordinate>>,
    pub directions: Mutex<Option<Directions>>,
    pub step_syncs: Mutex<Vec<StepSyncRequest>>,
    pub check_ins_today: Mutex<u32>,
    /// Overrides the next check-in answer.
    pub check_in_reply: Mutex<Option<CheckInResponse>>,
    pub check_in_posts: Mutex<Vec<String>>,
    pub balance: Mutex<u64>,
    pub balance_fails: Mutex<bool>,
    /// When set, the next balance read waits for this before answering.
    pub balance_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub balance_calls: Mutex<u32>,
    pub rewards: Mutex<Vec<Reward>>,
    pub redemptions: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_nearby(&self, reply: NearbyReply) {
        self.nearby_replies.lock().unwrap().push_back(reply);
    }

    pub fn nearby_call_count(&self) -> usize {
        self.nearby_calls.lock().unwrap().len()
    }

    pub fn step_syncs(&self) -> Vec<StepSyncRequest> {
        self.step_syncs.lock().unwrap().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    pub fn hold_next_balance(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.balance_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn balance_calls(&self) -> u32 {
        *self.balance_calls.lock().unwrap()
    }

    fn require_token(&self) -> Result<()> {
        match self.token() {
            Some(_) => Ok(()),
            None => Err(AppError::Unauthorized),
        }
    }
}

#[async_trait]
impl RewardsBackend for FakeBackend {
    fn set_auth_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn nearby_restaurants(
        &self,
        at: Coordinate,
        _radius_meters: f64,
    ) -> Result<Vec<Restaurant>> {
        self.nearby_calls.lock().unwrap().push(at);
        let reply = self.nearby_replies.lock().unwrap().pop_front();
        match reply {
            Some(NearbyReply::Now(places)) => Ok(places),
            Some(NearbyReply::Later(rx)) => rx
                .await
                .map_err(|_| AppError::Network(NetworkError::NoResponse("dropped".into()))),
            Some(NearbyReply::Fail(status)) => Err(backend_error(status)),
            None => Ok(self.nearby_default.lock().unwrap().clone()),
        }
    }

    async fn directions(&self, _from: Coordinate, _to: Coordinate) -> Result<Directions> {
        self.directions
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| backend_error(404))
    }

    async fn post_step_sync(&self, request: &StepSyncRequest) -> Result<StepRecord> {
        self.require_token()?;
        self.step_syncs.lock().unwrap().push(request.clone());
        Ok(StepRecord {
            date: request.date,
            step_count: request.step_count,
            points_earned: request.points_earned,
        })
    }

    async fn check_in_count(&self, restaurant_id: &str, date: NaiveDate) -> Result<CheckInRecord> {
        self.require_token()?;
        Ok(CheckInRecord {
            restaurant_id: restaurant_id.to_string(),
            date,
            count: *self.check_ins_today.lock().unwrap(),
        })
    }

    async fn post_check_in(
        &self,
        restaurant_id: &str,
        _at: Coordinate,
    ) -> Result<CheckInResponse> {
        self.require_token()?;
        self.check_in_posts
            .lock()
            .unwrap()
            .push(restaurant_id.to_string());
        if let Some(reply) = self.check_in_reply.lock().unwrap().take() {
            return Ok(reply);
        }
        let mut count = self.check_ins_today.lock().unwrap();
        *count += 1;
        Ok(CheckInResponse::Accepted(CheckInReceipt {
            restaurant_id: restaurant_id.to_string(),
            points_awarded: 25,
            count_today: *count,
        }))
    }

    async fn points_balance(&self) -> Result<PointsBalance> {
        self.require_token()?;
        *self.balance_calls.lock().unwrap() += 1;
        let gate = self.balance_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if *self.balance_fails.lock().unwrap() {
            return Err(backend_error(503));
        }
        Ok(PointsBalance::confirmed(*self.balance.lock().unwrap()))
    }

    async fn list_rewards(&self) -> Result<Vec<Reward>> {
        self.require_token()?;
        Ok(self.rewards.lock().unwrap().clone())
    }

    async fn redeem_reward(&self, reward_id: &str) -> Result<RedemptionReceipt> {
        self.require_token()?;
        self.redemptions.lock().unwrap().push(reward_id.to_string());
        let required = self
            .rewards
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == reward_id)
            .map(|r| r.points_required)
            .unwrap_or(0);
        let mut balance = self.balance.lock().unwrap();
        *balance = balance.saturating_sub(required);
        Ok(RedemptionReceipt {
            reward_id: reward_id.to_string(),
            remaining_points: *balance,
        })
    }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// Location provider driven by the test through [`FakeLocation::send`].
pub struct FakeLocation {
    pub permission: Mutex<PermissionStatus>,
    sender: Mutex<Option<mpsc::Sender<PositionFix>>>,
    pub watch_calls: Mutex<u32>,
    pub current: Mutex<Option<Coordinate>>,
    /// When set, the next permission prompt waits for this before answering.
    pub prompt_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub prompts: Mutex<u32>,
}

#[allow(dead_code)]
impl FakeLocation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(PermissionStatus::Granted),
            sender: Mutex::new(None),
            watch_calls: Mutex::new(0),
            current: Mutex::new(None),
            prompt_gate: Mutex::new(None),
            prompts: Mutex::new(0),
        })
    }

    pub fn deny(&self) {
        *self.permission.lock().unwrap() = PermissionStatus::Denied;
    }

    pub fn grant(&self) {
        *self.permission.lock().unwrap() = PermissionStatus::Granted;
    }

    pub fn watch_calls(&self) -> u32 {
        *self.watch_calls.lock().unwrap()
    }

    /// Keep the next permission prompt open until the sender fires.
    pub fn hold_next_prompt(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.prompt_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn prompts(&self) -> u32 {
        *self.prompts.lock().unwrap()
    }

    /// Whether a subscription receiver is still alive.
    pub fn is_subscribed(&self) -> bool {
        self.sender
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Emit a fix on the current subscription. Returns `false` if nobody
    /// is listening any more.
    pub async fn send(&self, coordinate: Coordinate) -> bool {
        let sender = self.sender.lock().unwrap().clone();
        match sender {
            Some(tx) => tx
                .send(PositionFix {
                    coordinate,
                    heading: Some(90.0),
                })
                .await
                .is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn request_foreground_permission(&self) -> PermissionStatus {
        *self.prompts.lock().unwrap() += 1;
        let gate = self.prompt_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        *self.permission.lock().unwrap()
    }

    async fn watch_position(&self, _options: WatchOptions) -> Result<mpsc::Receiver<PositionFix>> {
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock().unwrap() = Some(tx);
        *self.watch_calls.lock().unwrap() += 1;
        Ok(rx)
    }

    async fn current_position(&self) -> Result<Coordinate> {
        self.current
            .lock()
            .unwrap()
            .ok_or_else(|| AppError::LocationUnavailable("no fix".to_string()))
    }
}

// ─── Health & notifications ──────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeHealth {
    pub steps: Mutex<u64>,
    /// When set, the next read waits for this before answering.
    pub gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub reads: Mutex<u32>,
    pub ranges: Mutex<Vec<DateRange>>,
}

#[allow(dead_code)]
impl FakeHealth {
    pub fn new(steps: u64) -> Arc<Self> {
        let health = Self::default();
        *health.steps.lock().unwrap() = steps;
        Arc::new(health)
    }

    pub fn set_steps(&self, steps: u64) {
        *self.steps.lock().unwrap() = steps;
    }

    pub fn hold_next_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn reads(&self) -> u32 {
        *self.reads.lock().unwrap()
    }

    pub fn ranges(&self) -> Vec<DateRange> {
        self.ranges.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthDataProvider for FakeHealth {
    async fn daily_step_count(&self, range: DateRange) -> Result<u64> {
        *self.reads.lock().unwrap() += 1;
        self.ranges.lock().unwrap().push(range);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(*self.steps.lock().unwrap())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.body.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn schedule_notification(
        &self,
        notification: Notification,
        _delay: Duration,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

// ─── Session wiring ──────────────────────────────────────────────────────────

/// Handles to every fake behind a test session.
#[allow(dead_code)]
pub struct TestHarness {
    pub backend: Arc<FakeBackend>,
    pub location: Arc<FakeLocation>,
    pub health: Arc<FakeHealth>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
}

#[allow(dead_code)]
impl TestHarness {
    pub fn new() -> Self {
        Self {
            backend: FakeBackend::new(),
            location: FakeLocation::new(),
            health: FakeHealth::new(0),
            notifier: RecordingNotifier::new(),
            store: Arc::new(MemorySessionStore::default()),
            clock: test_clock(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            backend: self.backend.clone(),
            location: self.location.clone(),
            health: Some(self.health.clone()),
            notifier: self.notifier.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn config() -> Config {
        Config::default()
    }
}
