//! # cowrite Agent
//!
//! Host process for the collaborative transform engine.
//!
//! ## Architecture
//!
//! The agent runs one loop multiplexing three sources:
//! 1. **Ingress**: One JSON edit per stdin line, rebased when it names the
//!    version it was authored against, then applied
//! 2. **Egress**: One JSON snapshot per applied edit on stdout
//! 3. **Sweep**: Periodic reclamation of idle sessions
//!
//! Logs go to stderr so stdout stays machine readable.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod config;
mod runtime;

pub use config::AgentConfig;
pub use runtime::Agent;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting cowrite agent"
    );

    // Load configuration
    let config = AgentConfig::from_env()?;

    let agent = Agent::new(config);

    // Run agent
    agent.run().await?;

    Ok(())
}
