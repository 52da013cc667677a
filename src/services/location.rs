// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location subscription lifecycle.
//!
//! `LocationWatcher` is the only writer of the current location. It moves
//! through `Idle -> RequestingPermission -> Watching | Failed` and publishes
//! each platform fix into a latest-value cell (a `watch` channel). Older
//! samples are overwritten, never queued.
//!
//! `stop` bumps a generation counter, so a `start` that is still waiting on
//! the permission prompt or the platform gives up instead of subscribing.

use crate::error::{AppError, Result};
use crate::models::{Coordinate, LocationSample};
use crate::services::geo_math;
use crate::time_utils::Clock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Result of a foreground permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform accuracy tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
}

/// Options handed to the platform. Filtering by interval happens there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    pub time_interval: Duration,
    pub distance_interval_meters: f64,
}

impl WatchOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            accuracy: Accuracy::High,
            time_interval: config.watch_time_interval,
            distance_interval_meters: config.watch_distance_interval_meters,
        }
    }
}

/// A raw platform fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    pub heading: Option<f64>,
}

/// Platform permission and location services.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_foreground_permission(&self) -> PermissionStatus;

    /// Start a subscription. Dropping the receiver ends it.
    async fn watch_position(&self, options: WatchOptions) -> Result<mpsc::Receiver<PositionFix>>;

    /// One-shot position.
    async fn current_position(&self) -> Result<Coordinate>;
}

/// Lifecycle state of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    RequestingPermission,
    Watching,
    /// Permission was denied or the subscription could not be set up.
    /// No automatic retry; `start` must be called again.
    Failed,
}

pub struct LocationWatcher {
    provider: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    options: WatchOptions,
    state: Mutex<WatcherState>,
    subscription: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
    latest: Arc<watch::Sender<Option<LocationSample>>>,
}

impl LocationWatcher {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        clock: Arc<dyn Clock>,
        options: WatchOptions,
    ) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            provider,
            clock,
            options,
            state: Mutex::new(WatcherState::Idle),
            subscription: Mutex::new(None),
            generation: AtomicU64::new(0),
            latest: Arc::new(latest),
        }
    }

    pub fn state(&self) -> WatcherState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: WatcherState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<LocationSample> {
        self.latest.borrow().clone()
    }

    /// Receiver over the latest-sample cell.
    pub fn subscribe(&self) -> watch::Receiver<Option<LocationSample>> {
        self.latest.subscribe()
    }

    /// Request permission and begin watching.
    ///
    /// Any existing subscription is cancelled first, so calling this again
    /// (for example after a different user signs in) never duplicates
    /// callbacks.
    ///
    /// Returns `StaleRequestDiscarded` if `stop` ran while this was waiting.
    pub async fn start(&self) -> Result<()> {
        self.stop();
        let generation = self.generation.load(Ordering::Acquire);
        self.set_state(WatcherState::RequestingPermission);

        let permission = self.provider.request_foreground_permission().await;
        self.ensure_current(generation)?;
        match permission {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                tracing::warn!("Location permission denied");
                self.set_state(WatcherState::Failed);
                return Err(AppError::PermissionDenied);
            }
        }

        let subscribed = self.provider.watch_position(self.options).await;
        // Dropping the receiver ends a subscription nobody wants any more.
        self.ensure_current(generation)?;
        let mut fixes = match subscribed {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start location subscription");
                self.set_state(WatcherState::Failed);
                return Err(e);
            }
        };

        let latest = self.latest.clone();
        let clock = self.clock.clone();
        let handle = tokio::spawn(async move {
            while let Some(fix) = fixes.recv().await {
                let sample = LocationSample {
                    coordinate: fix.coordinate,
                    heading: normalize_heading(fix.heading),
                    timestamp: clock.now(),
                };
                latest.send_replace(Some(sample));
            }
            tracing::debug!("Location stream ended");
        });

        {
            let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
            if self.generation.load(Ordering::Acquire) != generation {
                handle.abort();
                return Err(AppError::StaleRequestDiscarded);
            }
            // Unchanged generation means nothing has subscribed since our stop.
            *subscription = Some(handle);
        }

        self.set_state(WatcherState::Watching);
        tracing::info!(
            time_interval_ms = self.options.time_interval.as_millis() as u64,
            distance_interval_m = self.options.distance_interval_meters,
            "Location watcher started"
        );
        Ok(())
    }

    /// Cancel the subscription. Safe to call any number of times.
    pub fn stop(&self) {
        let handle = {
            let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
            self.generation.fetch_add(1, Ordering::AcqRel);
            subscription.take()
        };

        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Location watcher stopped");
        }
        self.set_state(WatcherState::Idle);
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("Location watcher stopped during start, not subscribing");
            return Err(AppError::StaleRequestDiscarded);
        }
        Ok(())
    }

    /// Forget the last sample (used on logout so it can't leak into the
    /// next user's session).
    pub fn clear(&self) {
        self.latest.send_replace(None);
    }

    /// One-shot position straight from the provider.
    pub async fn current_position(&self) -> Result<Coordinate> {
        self.provider.current_position().await
    }
}

impl Drop for LocationWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Platforms report "unknown" heading as negative or NaN.
fn normalize_heading(heading: Option<f64>) -> Option<f64> {
    heading
        .filter(|h| h.is_finite() && *h >= 0.0)
        .map(|h| h % 360.0)
}

/// Provider that walks an encoded polyline at a fixed speed.
///
/// Always grants permission. Used by the headless binary and in tests.
#[derive(Debug, Clone)]
pub struct ReplayLocationProvider {
    path: Vec<Coordinate>,
    walking_speed_mps: f64,
}

impl ReplayLocationProvider {
    /// Typical walking pace.
    pub const DEFAULT_SPEED_MPS: f64 = 1.4;

    pub fn new(path: Vec<Coordinate>) -> Self {
        Self {
            path,
            walking_speed_mps: Self::DEFAULT_SPEED_MPS,
        }
    }

    /// Build from an encoded polyline (precision 5).
    pub fn from_polyline(encoded: &str) -> Result<Self> {
        let line = polyline::decode_polyline(encoded, 5).map_err(|e| {
            AppError::LocationUnavailable(format!("Invalid replay polyline: {}", e))
        })?;
        let path = line
            .0
            .into_iter()
            .map(Coordinate::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(path))
    }

    /// Path points spaced at most `step_meters` apart.
    fn densify(&self, step_meters: f64) -> Vec<Coordinate> {
        let mut points = Vec::new();
        let Some(first) = self.path.first() else {
            return points;
        };
        points.push(*first);

        for leg in self.path.windows(2) {
            let (a, b) = (leg[0], leg[1]);
            let length = geo_math::distance_meters(&a, &b);
            let pieces = (length / step_meters.max(0.1)).ceil().max(1.0) as usize;
            for i in 1..pieces {
                let t = i as f64 / pieces as f64;
                let lat = a.latitude() + (b.latitude() - a.latitude()) * t;
                let lon = a.longitude() + (b.longitude() - a.longitude()) * t;
                // Interpolating between two valid points stays valid.
                if let Ok(c) = Coordinate::new(lat, lon) {
                    points.push(c);
                }
            }
            points.push(b);
        }
        points
    }
}

#[async_trait]
impl LocationProvider for ReplayLocationProvider {
    async fn request_foreground_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn watch_position(&self, options: WatchOptions) -> Result<mpsc::Receiver<PositionFix>> {
        if self.path.is_empty() {
            return Err(AppError::LocationUnavailable(
                "Replay path is empty".to_string(),
            ));
        }

        let step = (self.walking_speed_mps * options.time_interval.as_secs_f64())
            .max(options.distance_interval_meters);
        let points = self.densify(step);
        let interval = options.time_interval;
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            for coordinate in points {
                let fix = PositionFix {
                    coordinate,
                    heading: None,
                };
                if tx.send(fix).await.is_err() {
                    // Subscriber went away
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });

        Ok(rx)
    }

    async fn current_position(&self) -> Result<Coordinate> {
        self.path
            .first()
            .copied()
            .ok_or_else(|| AppError::LocationUnavailable("Replay path is empty".to_string()))
    }
}
