// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic step sync.
//!
//! Handles the core workflow:
//! 1. Read today's cumulative step count from the health provider
//! 2. Skip if nothing changed since the last successful sync today
//! 3. Convert to points with `daily_step_points`
//! 4. Push the cumulative record to the backend (the backend owns totals)
//! 5. Fire milestone notifications at most once per milestone per day
//!
//! Without a health provider the scheduler is inert.

use crate::error::{AppError, Result};
use crate::models::StepRecord;
use crate::services::backend::{RewardsBackend, StepSyncRequest};
use crate::services::notifications::{Notification, Notifier};
use crate::services::points_policy::daily_step_points;
use crate::time_utils::Clock;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Step counts that earn a one-time daily notification.
pub const STEP_MILESTONES: [u64; 3] = [1_000, 5_000, 10_000];

/// Half-open time range covering one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Local midnight to now, per `clock`.
    pub fn today(clock: &dyn Clock) -> Self {
        Self {
            start: clock.start_of_today(),
            end: clock.now(),
        }
    }
}

/// Platform health/step data (HealthKit, Google Fit...).
#[async_trait]
pub trait HealthDataProvider: Send + Sync {
    async fn daily_step_count(&self, range: DateRange) -> Result<u64>;
}

/// What one sync attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No health provider on this platform.
    Inert,
    /// Another sync was already running; this call did nothing.
    AlreadyInFlight,
    /// Today's count matches the last submitted one.
    Unchanged,
    Synced(StepRecord),
}

/// Highest milestone already announced for a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MilestoneWatermark {
    date: NaiveDate,
    last_notified: u64,
}

/// Clears the in-flight flag however the sync ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StepSyncScheduler {
    health: Option<Arc<dyn HealthDataProvider>>,
    backend: Arc<dyn RewardsBackend>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    in_flight: AtomicBool,
    /// Bumped by `reset`; a sync started under an older value is dropped.
    generation: AtomicU64,
    last_synced: Mutex<Option<StepRecord>>,
    milestones: Mutex<Option<MilestoneWatermark>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl StepSyncScheduler {
    pub fn new(
        health: Option<Arc<dyn HealthDataProvider>>,
        backend: Arc<dyn RewardsBackend>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            health,
            backend,
            notifier,
            clock,
            interval,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            last_synced: Mutex::new(None),
            milestones: Mutex::new(None),
            timer: Mutex::new(None),
        }
    }

    pub fn is_inert(&self) -> bool {
        self.health.is_none()
    }

    /// Last record the backend accepted (a cache; may be stale).
    pub fn last_synced(&self) -> Option<StepRecord> {
        self.last_synced
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Start the periodic timer. The first tick syncs immediately.
    /// Restarting replaces any running timer.
    pub fn start(self: &Arc<Self>) {
        if self.is_inert() {
            tracing::info!("No health data provider, step sync disabled");
            return;
        }

        let this = Arc::clone(self);
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = this.sync_now().await {
                    // Try again next cycle
                    tracing::warn!(error = %e, transient = e.is_transient(), "Step sync failed");
                }
            }
        });

        let previous = self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Step sync scheduled"
        );
    }

    /// Stop the periodic timer. Idempotent.
    pub fn stop(&self) {
        if let Some(handle) = self
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
            tracing::debug!("Step sync stopped");
        }
    }

    /// Forget cached state (on logout).
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.stop();
        *self.last_synced.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.milestones.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Foreground resume: sync once, outside the timer.
    pub async fn on_foreground(&self) -> Result<SyncOutcome> {
        self.sync_now().await
    }

    /// Run one sync. Overlapping calls (timer vs. foreground) collapse into
    /// one: the loser returns `AlreadyInFlight` without touching the backend.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let Some(health) = self.health.as_ref() else {
            return Ok(SyncOutcome::Inert);
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Step sync already in flight");
            return Ok(SyncOutcome::AlreadyInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let generation = self.generation.load(Ordering::Acquire);
        let today = self.clock.today();
        let steps = health
            .daily_step_count(DateRange::today(self.clock.as_ref()))
            .await?;
        self.ensure_current(generation)?;

        self.check_milestones(today, steps).await;

        let previous = self.last_synced();
        if let Some(prev) = previous.as_ref().filter(|p| p.date == today) {
            if prev.step_count == steps {
                tracing::debug!(steps, "Step count unchanged, skipping sync");
                return Ok(SyncOutcome::Unchanged);
            }
            if steps < prev.step_count {
                // Submitted as-is; the backend decides whether to accept it.
                tracing::warn!(
                    previous = prev.step_count,
                    current = steps,
                    "Health provider reported fewer steps than last sync"
                );
            }
        }

        let request = StepSyncRequest {
            date: today,
            step_count: steps,
            points_earned: daily_step_points(steps),
        };
        let record = self.backend.post_step_sync(&request).await?;
        self.ensure_current(generation)?;

        tracing::info!(
            date = %record.date,
            steps = record.step_count,
            points = record.points_earned,
            "Steps synced"
        );
        *self.last_synced.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
        Ok(SyncOutcome::Synced(record))
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("Scheduler was reset during step sync, dropping result");
            return Err(AppError::StaleRequestDiscarded);
        }
        Ok(())
    }

    /// Announce the highest newly crossed milestone, if any.
    async fn check_milestones(&self, today: NaiveDate, steps: u64) {
        let milestone = {
            let mut guard = self.milestones.lock().unwrap_or_else(|e| e.into_inner());
            let watermark = match *guard {
                Some(w) if w.date == today => w,
                _ => MilestoneWatermark {
                    date: today,
                    last_notified: 0,
                },
            };

            let reached = STEP_MILESTONES
                .iter()
                .rev()
                .copied()
                .find(|m| steps >= *m && *m > watermark.last_notified);

            *guard = Some(MilestoneWatermark {
                date: today,
                last_notified: reached.unwrap_or(watermark.last_notified),
            });
            reached
        };

        let Some(milestone) = milestone else {
            return;
        };

        let notification = Notification {
            title: "Milestone reached!".to_string(),
            body: format!("You've walked {} steps today. Keep it up!", milestone),
        };
        if let Err(e) = self
            .notifier
            .schedule_notification(notification, Duration::ZERO)
            .await
        {
            tracing::warn!(error = %e, milestone, "Failed to schedule milestone notification");
        }
    }
}
