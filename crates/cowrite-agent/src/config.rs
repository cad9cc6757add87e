//! Agent configuration.

use anyhow::{bail, Context, Result};
use cowrite_core::EngineConfig;
use std::time::Duration;

/// Agent configuration.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// Engine tuning
    pub engine: EngineConfig,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `COWRITE_HISTORY_LIMIT`: Operations retained per session
    /// - `COWRITE_MAX_IDLE_SECS`: Idle time before a session is reclaimed
    /// - `COWRITE_CLEANUP_INTERVAL_SECS`: Seconds between idle sweeps
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed, or if the
    /// cleanup interval is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(limit) = lookup("COWRITE_HISTORY_LIMIT") {
            config.engine.history_limit = limit
                .trim()
                .parse()
                .context("Invalid COWRITE_HISTORY_LIMIT")?;
        }

        if let Some(secs) = lookup("COWRITE_MAX_IDLE_SECS") {
            config.engine.max_idle = parse_secs(&secs).context("Invalid COWRITE_MAX_IDLE_SECS")?;
        }

        if let Some(secs) = lookup("COWRITE_CLEANUP_INTERVAL_SECS") {
            config.engine.cleanup_interval =
                parse_secs(&secs).context("Invalid COWRITE_CLEANUP_INTERVAL_SECS")?;
        }

        if config.engine.cleanup_interval.is_zero() {
            bail!("COWRITE_CLEANUP_INTERVAL_SECS must be greater than zero");
        }

        Ok(config)
    }
}

fn parse_secs(value: &str) -> Result<Duration> {
    Ok(Duration::from_secs(value.trim().parse()?))
}
