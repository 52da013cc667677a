// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local notification scheduling.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Title and body of a local notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Platform local-notification scheduler.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn schedule_notification(&self, notification: Notification, delay: Duration)
        -> Result<()>;
}

/// Notifier that only writes to the log. Used by the headless binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn schedule_notification(
        &self,
        notification: Notification,
        delay: Duration,
    ) -> Result<()> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            delay_ms = delay.as_millis() as u64,
            "Notification scheduled"
        );
        Ok(())
    }
}
