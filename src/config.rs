//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Backend ---
    /// Base URL of the rewards REST API (no trailing slash)
    pub api_base_url: String,

    // --- Proximity & nearby places ---
    /// Distance at or under which the user counts as "at" the restaurant
    pub near_threshold_meters: f64,
    /// Quiet period after a triggering location update before fetching places
    pub nearby_debounce: Duration,
    /// Grid cell size used to bucket locations for nearby lookups
    pub nearby_bucket_meters: f64,
    /// Search radius sent to the nearby-restaurants endpoint
    pub nearby_radius_meters: f64,
    /// How long a bucket's nearby result is served from cache
    pub nearby_cache_ttl: Duration,

    // --- Location watcher ---
    /// Minimum time between platform location callbacks
    pub watch_time_interval: Duration,
    /// Minimum movement between platform location callbacks
    pub watch_distance_interval_meters: f64,

    // --- Step sync ---
    /// Cadence of the periodic step sync
    pub step_sync_interval: Duration,

    // --- Session bootstrap ---
    /// Where the persisted session (token + user id) lives
    pub session_file: PathBuf,
    /// Optional credentials used to log in when no session is stored
    pub user_token: Option<String>,
    pub user_id: Option<String>,

    /// Optional encoded polyline replayed as the device location
    pub replay_polyline: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            near_threshold_meters: 150.0,
            nearby_debounce: Duration::from_secs(10),
            nearby_bucket_meters: 250.0,
            nearby_radius_meters: 5000.0,
            nearby_cache_ttl: Duration::from_secs(300),
            watch_time_interval: Duration::from_millis(2000),
            watch_distance_interval_meters: 5.0,
            step_sync_interval: Duration::from_secs(15 * 60),
            session_file: PathBuf::from(".rewards-session.json"),
            user_token: None,
            user_id: None,
            replay_polyline: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("API_BASE_URL"))?,
            near_threshold_meters: parse_or("NEAR_THRESHOLD_METERS", 150.0)?,
            nearby_debounce: Duration::from_secs(parse_or("NEARBY_DEBOUNCE_SECS", 10)?),
            nearby_bucket_meters: parse_or("NEARBY_BUCKET_METERS", 250.0)?,
            nearby_radius_meters: parse_or("NEARBY_RADIUS_METERS", 5000.0)?,
            nearby_cache_ttl: Duration::from_secs(parse_or("NEARBY_CACHE_TTL_SECS", 300)?),
            watch_time_interval: Duration::from_millis(parse_or("WATCH_TIME_INTERVAL_MS", 2000)?),
            watch_distance_interval_meters: parse_or("WATCH_DISTANCE_INTERVAL_METERS", 5.0)?,
            step_sync_interval: Duration::from_secs(parse_or("STEP_SYNC_INTERVAL_SECS", 900)?),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            user_token: non_empty("USER_TOKEN"),
            user_id: non_empty("USER_ID"),
            replay_polyline: non_empty("REPLAY_POLYLINE"),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
