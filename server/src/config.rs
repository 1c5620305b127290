//! Relay configuration parsed from environment variables.
//!
//! Every knob has a default so the relay starts with no environment at all.
//! Unparseable tuning values fall back to their defaults; only a bad `PORT`
//! or contradictory log bounds are fatal.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_OPLOG_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_OPLOG_TRIM_TO: usize = 500;
pub const DEFAULT_REDO_MAX_DEPTH: usize = 100;
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 8 * 1024 * 1024;
pub const DEFAULT_MAX_POINTS_PER_STROKE: usize = 5000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
    #[error("OPLOG_TRIM_TO ({trim_to}) must not exceed OPLOG_MAX_ENTRIES ({max})")]
    TrimExceedsMax { trim_to: usize, max: usize },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Per-room capacity bounds. Exceeding them evicts oldest data, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomLimits {
    /// Operation log length that triggers trimming.
    pub oplog_max_entries: usize,
    /// Operation log length kept after trimming (newest entries survive).
    pub oplog_trim_to: usize,
    /// Deepest per-author redo stack.
    pub redo_max_depth: usize,
    /// Points accumulated per open stroke; later points are relayed only.
    pub max_points_per_stroke: usize,
    /// Largest accepted `snapshot-update` payload.
    pub max_snapshot_bytes: usize,
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            oplog_max_entries: DEFAULT_OPLOG_MAX_ENTRIES,
            oplog_trim_to: DEFAULT_OPLOG_TRIM_TO,
            redo_max_depth: DEFAULT_REDO_MAX_DEPTH,
            max_points_per_stroke: DEFAULT_MAX_POINTS_PER_STROKE,
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub port: u16,
    /// Directory of client assets served at `/`. `None` disables static serving.
    pub public_dir: Option<PathBuf>,
    /// Outbound queue depth per connection before events are dropped.
    pub client_queue_capacity: usize,
    pub limits: RoomLimits,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            public_dir: None,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            limits: RoomLimits::default(),
        }
    }
}

impl RelayConfig {
    /// Build typed relay config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PUBLIC_DIR`: static client bundle directory
    /// - `OPLOG_MAX_ENTRIES`: default 1000
    /// - `OPLOG_TRIM_TO`: default 500
    /// - `REDO_MAX_DEPTH`: default 100
    /// - `CLIENT_QUEUE_CAPACITY`: default 256
    /// - `MAX_SNAPSHOT_BYTES`: default 8 MiB
    /// - `MAX_POINTS_PER_STROKE`: default 5000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unparseable port or inconsistent bounds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };
        let public_dir = std::env::var("PUBLIC_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let config = Self {
            port,
            public_dir,
            client_queue_capacity: env_parse("CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY),
            limits: RoomLimits {
                oplog_max_entries: env_parse("OPLOG_MAX_ENTRIES", DEFAULT_OPLOG_MAX_ENTRIES),
                oplog_trim_to: env_parse("OPLOG_TRIM_TO", DEFAULT_OPLOG_TRIM_TO),
                redo_max_depth: env_parse("REDO_MAX_DEPTH", DEFAULT_REDO_MAX_DEPTH),
                max_points_per_stroke: env_parse("MAX_POINTS_PER_STROKE", DEFAULT_MAX_POINTS_PER_STROKE),
                max_snapshot_bytes: env_parse("MAX_SNAPSHOT_BYTES", DEFAULT_MAX_SNAPSHOT_BYTES),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_queue_capacity == 0 {
            return Err(ConfigError::Zero("CLIENT_QUEUE_CAPACITY"));
        }
        if self.limits.oplog_max_entries == 0 {
            return Err(ConfigError::Zero("OPLOG_MAX_ENTRIES"));
        }
        if self.limits.oplog_trim_to > self.limits.oplog_max_entries {
            return Err(ConfigError::TrimExceedsMax {
                trim_to: self.limits.oplog_trim_to,
                max: self.limits.oplog_max_entries,
            });
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
