// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and the injectable wall clock.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::sync::Mutex;

/// Format a calendar day as ISO-8601 (`YYYY-MM-DD`).
pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Source of wall-clock time and of the user's current calendar day.
///
/// Timers use tokio's clock; this only answers "what day is it".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day the daily aggregates (steps, check-ins) belong to.
    fn today(&self) -> NaiveDate;

    /// The instant `today()` began, in the same zone `today()` uses.
    fn start_of_today(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time, with days in the device's local zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn start_of_today(&self) -> DateTime<Utc> {
        let now = Local::now();
        let midnight = now.date_naive().and_time(NaiveTime::MIN);
        // Midnight can fall in a DST gap; then use the current offset.
        Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|start| start.with_timezone(&Utc))
            .unwrap_or_else(|| (midnight - *now.offset()).and_utc())
    }
}

/// Manually driven clock for tests. Days are taken in UTC unless a fixed
/// offset is given.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_offset(now, Utc.fix())
    }

    pub fn with_offset(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset).date_naive()
    }

    fn start_of_today(&self) -> DateTime<Utc> {
        (self.today().and_time(NaiveTime::MIN) - self.offset).and_utc()
    }
}
