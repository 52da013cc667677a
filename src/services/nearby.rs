// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Debounced nearby-restaurant lookups.
//!
//! Location samples arrive every couple of seconds. Only a sample that lands
//! in a new location bucket triggers a lookup, and the lookup waits for the
//! debounce window to pass without another trigger. A newer lookup aborts
//! the pending one; every lookup also carries a sequence number, and a
//! response older than the one already applied is discarded.

use crate::error::{AppError, Result};
use crate::models::{Coordinate, LocationBucket, Restaurant};
use crate::services::backend::RewardsBackend;
use crate::services::debounce::Debouncer;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Result of the most recent lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum NearbyPlaces {
    NotFetched,
    /// May be empty: "nothing nearby" is a real answer.
    Loaded(Vec<Restaurant>),
}

/// Cached lookup result for one bucket.
#[derive(Clone)]
struct CachedPlaces {
    places: Vec<Restaurant>,
    fetched_at: Instant,
}

/// Tunables for [`NearbyPlacesFetcher`].
#[derive(Debug, Clone, Copy)]
pub struct NearbySettings {
    pub debounce: Duration,
    pub bucket_meters: f64,
    pub radius_meters: f64,
    pub cache_ttl: Duration,
}

impl NearbySettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            debounce: config.nearby_debounce,
            bucket_meters: config.nearby_bucket_meters,
            radius_meters: config.nearby_radius_meters,
            cache_ttl: config.nearby_cache_ttl,
        }
    }
}

pub struct NearbyPlacesFetcher {
    backend: Arc<dyn RewardsBackend>,
    settings: NearbySettings,
    debouncer: Debouncer,
    /// Sequence number of the most recently issued lookup.
    issued: AtomicU64,
    /// Sequence number of the result currently published.
    applied: Mutex<u64>,
    state: watch::Sender<NearbyPlaces>,
    cache: DashMap<LocationBucket, CachedPlaces>,
    last_bucket: Mutex<Option<LocationBucket>>,
}

impl NearbyPlacesFetcher {
    pub fn new(backend: Arc<dyn RewardsBackend>, settings: NearbySettings) -> Self {
        let (state, _) = watch::channel(NearbyPlaces::NotFetched);
        Self {
            backend,
            settings,
            debouncer: Debouncer::new(settings.debounce),
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
            state,
            cache: DashMap::new(),
            last_bucket: Mutex::new(None),
        }
    }

    pub fn places(&self) -> NearbyPlaces {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NearbyPlaces> {
        self.state.subscribe()
    }

    /// Feed a location sample. Returns `true` if it triggered a (debounced)
    /// lookup, `false` if it stayed within the current bucket.
    pub fn on_location(self: &Arc<Self>, coordinate: Coordinate) -> bool {
        let bucket = LocationBucket::from_coordinate(coordinate, self.settings.bucket_meters);
        {
            let mut last = self.last_bucket.lock().unwrap_or_else(|e| e.into_inner());
            if *last == Some(bucket) {
                return false;
            }
            *last = Some(bucket);
        }

        tracing::debug!(
            lat_index = bucket.lat_index,
            lon_index = bucket.lon_index,
            "Location entered new bucket, scheduling nearby lookup"
        );

        let this = Arc::clone(self);
        self.debouncer.schedule(async move {
            match this.fetch(coordinate).await {
                Ok(places) => {
                    tracing::debug!(count = places.len(), "Nearby restaurants updated");
                }
                Err(AppError::StaleRequestDiscarded) => {}
                Err(e) => {
                    // Retry when the next sample arrives, even in this bucket
                    tracing::warn!(error = %e, "Nearby lookup failed");
                    this.forget_bucket(bucket);
                }
            }
        });
        true
    }

    fn forget_bucket(&self, bucket: LocationBucket) {
        let mut last = self.last_bucket.lock().unwrap_or_else(|e| e.into_inner());
        if *last == Some(bucket) {
            *last = None;
        }
    }

    /// Look up restaurants around `coordinate` right away (no debounce).
    ///
    /// Returns `StaleRequestDiscarded` if a newer lookup already published
    /// its result by the time this one resolved.
    pub async fn fetch(&self, coordinate: Coordinate) -> Result<Vec<Restaurant>> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let bucket = LocationBucket::from_coordinate(coordinate, self.settings.bucket_meters);

        let cached = self
            .cache
            .get(&bucket)
            .filter(|c| c.fetched_at.elapsed() < self.settings.cache_ttl)
            .map(|c| c.places.clone());

        let places = match cached {
            Some(places) => {
                tracing::debug!(seq, "Nearby cache hit");
                places
            }
            None => {
                let places = self
                    .backend
                    .nearby_restaurants(coordinate, self.settings.radius_meters)
                    .await?;
                let ttl = self.settings.cache_ttl;
                self.cache.retain(|_, c| c.fetched_at.elapsed() < ttl);
                self.cache.insert(
                    bucket,
                    CachedPlaces {
                        places: places.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                places
            }
        };

        self.publish(seq, places.clone())?;
        Ok(places)
    }

    /// Number of buckets currently held in the cache.
    pub fn cached_buckets(&self) -> usize {
        self.cache.len()
    }

    fn publish(&self, seq: u64, places: Vec<Restaurant>) -> Result<()> {
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        if seq < *applied {
            tracing::debug!(seq, applied = *applied, "Discarding stale nearby result");
            return Err(AppError::StaleRequestDiscarded);
        }
        *applied = seq;
        self.state.send_replace(NearbyPlaces::Loaded(places));
        Ok(())
    }

    /// Drop pending work, cached results and the published list.
    pub fn reset(&self) {
        self.debouncer.cancel();
        self.cache.clear();
        *self.last_bucket.lock().unwrap_or_else(|e| e.into_inner()) = None;

        // Anything still in flight is now older than the reset.
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        *applied = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(NearbyPlaces::NotFetched);
    }
}
