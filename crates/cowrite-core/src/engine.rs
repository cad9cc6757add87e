//! Call surface used by a collaboration-session manager.
//!
//! [`Engine`] pairs a [`DocumentStore`] with the pure transform functions
//! so callers have a single handle to share (typically via `Arc`).

use crate::config::EngineConfig;
use crate::document::{DocumentState, DocumentStore, EngineStats};
use crate::operation::{Operation, SessionId};
use crate::transform::{self, Priority};
use chrono::{DateTime, Utc};

/// The collaborative transform engine.
#[derive(Debug, Default)]
pub struct Engine {
    store: DocumentStore,
}

impl Engine {
    /// Create an engine with an empty session table.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: DocumentStore::new(config),
        }
    }

    /// The underlying session store.
    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Reset a session's document, optionally seeding its content.
    pub fn initialize_document(
        &self,
        session: &SessionId,
        content: Option<&str>,
    ) -> DocumentState {
        self.store.initialize(session, content.unwrap_or_default())
    }

    /// Apply an already-transformed operation to a session.
    pub fn apply_operation(&self, session: &SessionId, operation: Operation) -> DocumentState {
        self.store.apply(session, operation)
    }

    /// Snapshot of a session's document.
    #[must_use]
    pub fn get_document_state(&self, session: &SessionId) -> Option<DocumentState> {
        self.store.get(session)
    }

    /// See [`transform::transform`].
    #[must_use]
    pub fn transform(&self, a: &Operation, b: &Operation) -> (Operation, Priority) {
        transform::transform(a, b)
    }

    /// See [`transform::transform_batch`].
    #[must_use]
    pub fn transform_batch(&self, ops: Vec<Operation>) -> Vec<Operation> {
        transform::transform_batch(ops)
    }

    /// Reclaim sessions idle for longer than the configured threshold.
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        self.store.cleanup(now, self.store.config().max_idle)
    }

    /// Aggregate statistics over live sessions.
    #[must_use]
    pub fn get_stats(&self) -> EngineStats {
        self.store.stats()
    }
}
