//! Agent runtime orchestration.

use crate::config::AgentConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use cowrite_core::Engine;
use cowrite_proto::{DocumentSnapshot, EditMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    engine: Engine,
}

impl Agent {
    /// Create a new agent with an empty session table.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        let engine = Engine::new(config.engine.clone());
        Self { config, engine }
    }

    /// The engine owned by this agent.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Serve edits from stdin and write snapshots to stdout.
    ///
    /// # Errors
    ///
    /// Returns error if stdin or stdout fail.
    pub async fn run(self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve edits until the input ends or Ctrl+C is received.
    ///
    /// Each input line is one JSON [`EditMessage`]; each applied edit
    /// produces one JSON [`DocumentSnapshot`] line. Idle sessions are swept
    /// on the configured interval.
    ///
    /// # Errors
    ///
    /// Returns error if reading input or writing output fails. Bad edits
    /// are logged and skipped.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            history_limit = self.config.engine.history_limit,
            max_idle_secs = self.config.engine.max_idle.as_secs(),
            cleanup_interval_secs = self.config.engine.cleanup_interval.as_secs(),
            "Starting agent runtime"
        );

        let mut lines = reader.lines();
        let mut sweep = tokio::time::interval(self.config.engine.cleanup_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        sweep.tick().await;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read edit stream")? else {
                        tracing::info!("Edit stream closed");
                        break;
                    };

                    if let Some(snapshot) = self.handle_line(&line) {
                        let json = match snapshot.to_json() {
                            Ok(json) => json,
                            Err(err) => {
                                tracing::warn!(error = %err, "Failed to encode snapshot");
                                continue;
                            }
                        };
                        writer.write_all(json.as_bytes()).await.context("Failed to write snapshot")?;
                        writer.write_all(b"\n").await.context("Failed to write snapshot")?;
                        writer.flush().await.context("Failed to flush snapshot")?;
                    }
                }

                _ = sweep.tick() => {
                    let removed = self.engine.cleanup(Utc::now());
                    tracing::debug!(removed, "Cleanup sweep finished");
                }

                // Handle shutdown
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        let stats = self.engine.get_stats();
        tracing::info!(
            sessions = stats.total_sessions,
            operations = stats.total_operations,
            "Agent stopped"
        );
        Ok(())
    }

    /// Decode and apply one input line.
    fn handle_line(&self, line: &str) -> Option<DocumentSnapshot> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let msg = match EditMessage::from_json(line) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to decode edit");
                return None;
            }
        };

        if msg.operation.session() != &msg.session {
            tracing::warn!(
                session = %msg.session,
                operation_session = %msg.operation.session(),
                "Edit targets a different session than its operation"
            );
            return None;
        }

        let state = match msg.base_version {
            Some(base_version) => {
                match self
                    .engine
                    .store()
                    .apply_from(&msg.session, msg.operation, base_version)
                {
                    Ok(state) => state,
                    Err(err) => {
                        tracing::warn!(session = %msg.session, error = %err, "Rejected edit");
                        return None;
                    }
                }
            }
            None => {
                tracing::debug!(
                    session = %msg.session,
                    operation = %msg.operation.id(),
                    "Applied edit without rebase"
                );
                self.engine.apply_operation(&msg.session, msg.operation)
            }
        };

        Some(DocumentSnapshot::from_state(msg.session, &state))
    }
}
