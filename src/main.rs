// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rewards-Tracker headless client
//!
//! Runs the rewards engine against the backend with a replayed route as the
//! device location. Useful for exercising the backend end to end.

use rewards_tracker::{
    config::Config,
    db::{FileSessionStore, StoredSession},
    services::{HttpBackend, LogNotifier, ReplayLocationProvider},
    time_utils::SystemClock,
    Services, Session,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(api = %config.api_base_url, "Starting Rewards-Tracker");

    let Some(polyline) = config.replay_polyline.as_deref() else {
        anyhow::bail!("REPLAY_POLYLINE is required for the headless client");
    };
    let location = ReplayLocationProvider::from_polyline(polyline)?;

    let services = Services {
        backend: Arc::new(HttpBackend::new(&config.api_base_url)),
        location: Arc::new(location),
        // No health integration on this platform; step sync stays inert
        health: None,
        notifier: Arc::new(LogNotifier),
        store: Arc::new(FileSessionStore::new(&config.session_file)),
        clock: Arc::new(SystemClock),
    };
    let session = Session::new(&config, services);

    let restored = session.restore().await?;
    if !restored {
        match (config.user_token.clone(), config.user_id.clone()) {
            (Some(user_token), Some(user_id)) => {
                session
                    .login(StoredSession {
                        user_token,
                        user_id,
                    })
                    .await?;
            }
            _ => {
                anyhow::bail!("No stored session; set USER_TOKEN and USER_ID to sign in");
            }
        }
    }

    let mut places = session.nearby_fetcher().subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = places.changed() => {
                if changed.is_err() {
                    break;
                }
                let nearby = places.borrow_and_update().clone();
                tracing::info!(places = ?nearby, proximity = ?session.proximity(), "Nearby restaurants");
            }
        }
    }

    session.shutdown();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rewards_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
