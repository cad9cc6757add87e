//! Engine tuning knobs.

use std::time::Duration;

/// Number of applied operations retained per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Idle time after which a session is reclaimed.
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

/// Interval between idle-session sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Configuration for a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum history entries kept per session
    pub history_limit: usize,
    /// Sessions without operations for longer than this are removed
    pub max_idle: Duration,
    /// How often a host should run the idle sweep
    pub cleanup_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_idle: DEFAULT_MAX_IDLE,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}
