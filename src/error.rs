// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by every service.
//!
//! Expected business outcomes (daily check-in limit, insufficient points)
//! are not errors and live with their policies as plain enums.

/// Failure talking to the rewards backend.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("No response from backend: {0}")]
    NoResponse(String),

    /// The backend answered with a non-2xx status.
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered 2xx but the body could not be decoded.
    #[error("Malformed response body: {0}")]
    MalformedBody(String),
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Invalid coordinate: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid distance: {0}")]
    InvalidDistance(f64),

    #[error("Authentication required")]
    Unauthorized,

    /// A newer request superseded this one; its result was dropped.
    #[error("Stale request discarded")]
    StaleRequestDiscarded,

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether retrying on the next cycle (next location change, next sync
    /// tick) has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::LocationUnavailable(_) => true,
            AppError::Network(NetworkError::NoResponse(_)) => true,
            AppError::Network(NetworkError::Status { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
