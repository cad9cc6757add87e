//! Per-session document state and the store that owns it.
//!
//! The store keeps one [`DocumentState`] per session behind its own mutex,
//! inside a table guarded by a reader-writer lock:
//! - `apply` on an existing session holds the table lock shared, so
//!   different sessions never wait on each other
//! - creating a session or sweeping idle ones holds it exclusively, so a
//!   sweep can never drop a session while an operation is being applied

use crate::config::EngineConfig;
use crate::operation::{Operation, SessionId};
use crate::transform::transform;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::time::Duration;

/// Authoritative snapshot of one session's document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    /// Current full text
    pub content: String,
    /// Number of operations applied since initialization
    pub version: u64,
    /// Most recently applied operations, oldest first
    pub history: VecDeque<Operation>,
}

impl DocumentState {
    /// Create a version-0 state holding `content`.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            version: 0,
            history: VecDeque::new(),
        }
    }

    /// Timestamp of the most recent history entry, or the UNIX epoch.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.history
            .back()
            .map_or(DateTime::<Utc>::UNIX_EPOCH, Operation::timestamp)
    }

    /// Retained operations applied after `version`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionAhead`] if `version` is newer than this
    /// state, or [`StoreError::HistoryTruncated`] if some of the operations
    /// have already been dropped from history.
    pub fn operations_since(&self, version: u64) -> Result<Vec<Operation>, StoreError> {
        if version > self.version {
            return Err(StoreError::VersionAhead {
                requested: version,
                current: self.version,
            });
        }

        let missing = usize::try_from(self.version - version).unwrap_or(usize::MAX);
        if missing > self.history.len() {
            return Err(StoreError::HistoryTruncated {
                requested: version,
                oldest: self.oldest_version(),
            });
        }

        Ok(self
            .history
            .iter()
            .skip(self.history.len() - missing)
            .cloned()
            .collect())
    }

    /// Oldest base version that [`operations_since`](Self::operations_since)
    /// can still serve.
    #[must_use]
    pub fn oldest_version(&self) -> u64 {
        self.version
            .saturating_sub(u64::try_from(self.history.len()).unwrap_or(u64::MAX))
    }

    /// Transform `operation`, authored against `base_version`, over every
    /// operation applied since.
    fn rebase(&self, operation: Operation, base_version: u64) -> Result<Operation, StoreError> {
        let applied = self.operations_since(base_version)?;
        Ok(applied
            .iter()
            .fold(operation, |acc, prior| transform(&acc, prior).0))
    }

    fn apply(&mut self, operation: Operation, history_limit: usize) {
        self.content = operation.apply_to(&self.content);
        self.version += 1;
        self.history.push_back(operation);
        while self.history.len() > history_limit {
            self.history.pop_front();
        }
    }
}

/// Aggregate counters over the sessions currently held in memory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Live sessions
    pub total_sessions: usize,
    /// Retained history entries across all sessions.
    ///
    /// Entries dropped by the history limit are not counted; use each
    /// session's `version` for a lifetime count.
    pub total_operations: usize,
    /// `total_operations / total_sessions`, or 0 with no sessions
    pub avg_operations_per_session: f64,
}

type SessionTable = HashMap<SessionId, Mutex<DocumentState>>;

/// In-memory table of session documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    config: EngineConfig,
    sessions: RwLock<SessionTable>,
}

impl DocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration this store was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reset (or create) a session's document to `content` at version 0.
    ///
    /// Any prior state for the session is discarded.
    pub fn initialize(&self, session: &SessionId, content: impl Into<String>) -> DocumentState {
        let state = DocumentState::new(content);
        self.sessions
            .write()
            .insert(session.clone(), Mutex::new(state.clone()));

        tracing::debug!(
            session = %session,
            len = state.content.len(),
            "Initialized document"
        );
        state
    }

    /// Snapshot of a session's document, if it exists.
    #[must_use]
    pub fn get(&self, session: &SessionId) -> Option<DocumentState> {
        self.sessions
            .read()
            .get(session)
            .map(|slot| slot.lock().clone())
    }

    /// Apply an already-transformed operation to a session's document.
    ///
    /// The session is created empty if it does not exist yet.
    /// Out-of-range positions are clamped rather than rejected.
    pub fn apply(&self, session: &SessionId, operation: Operation) -> DocumentState {
        let history_limit = self.config.history_limit;
        self.with_session(session, |state| {
            let kind = operation.kind();
            state.apply(operation, history_limit);
            tracing::debug!(
                session = %session,
                %kind,
                version = state.version,
                "Applied operation"
            );
            state.clone()
        })
    }

    /// Transform `operation`, authored against `base_version`, over the
    /// operations applied since, then apply it.
    ///
    /// Rebase and apply happen under one session lock, so no other
    /// operation can be applied in between.
    ///
    /// # Errors
    ///
    /// Returns an error if the operations since `base_version` are no
    /// longer retained or `base_version` is in the future. The document is
    /// left untouched in that case, and a missing session is not created.
    pub fn apply_from(
        &self,
        session: &SessionId,
        operation: Operation,
        base_version: u64,
    ) -> Result<DocumentState, StoreError> {
        let history_limit = self.config.history_limit;
        self.try_with_session(session, |state| {
            let rebased = state.rebase(operation, base_version)?;
            state.apply(rebased, history_limit);
            tracing::debug!(
                session = %session,
                base_version,
                version = state.version,
                "Applied rebased operation"
            );
            Ok::<_, StoreError>(state.clone())
        })
    }

    /// Transform `operation`, authored against `base_version`, so it is
    /// valid against the session's current content.
    ///
    /// A missing session is treated as an empty version-0 document.
    ///
    /// # Errors
    ///
    /// See [`DocumentState::operations_since`].
    pub fn rebase(
        &self,
        session: &SessionId,
        operation: Operation,
        base_version: u64,
    ) -> Result<Operation, StoreError> {
        match self.sessions.read().get(session) {
            Some(slot) => slot.lock().rebase(operation, base_version),
            None => DocumentState::default().rebase(operation, base_version),
        }
    }

    /// Retained operations applied to `session` after `version`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownSession`] if the session does not
    /// exist, otherwise see [`DocumentState::operations_since`].
    pub fn operations_since(
        &self,
        session: &SessionId,
        version: u64,
    ) -> Result<Vec<Operation>, StoreError> {
        let sessions = self.sessions.read();
        let slot = sessions
            .get(session)
            .ok_or_else(|| StoreError::UnknownSession(session.clone()))?;
        let state = slot.lock();
        state.operations_since(version)
    }

    /// Drop a session's document. Returns `true` if it existed.
    pub fn remove(&self, session: &SessionId) -> bool {
        let removed = self.sessions.write().remove(session).is_some();
        if removed {
            tracing::debug!(session = %session, "Removed document");
        }
        removed
    }

    /// Remove every session whose last operation is more than `max_idle`
    /// older than `now`. Returns the number of sessions removed.
    pub fn cleanup(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();

        sessions.retain(|session, slot| {
            let last = slot.get_mut().last_activity();
            let idle = now
                .signed_duration_since(last)
                .to_std()
                .is_ok_and(|idle| idle > max_idle);
            if idle {
                tracing::debug!(session = %session, %last, "Reclaiming idle document");
            }
            !idle
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Cleaned up idle sessions");
        }
        removed
    }

    /// Aggregate statistics over the sessions in memory.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> EngineStats {
        let sessions = self.sessions.read();
        let total_sessions = sessions.len();
        let total_operations: usize = sessions
            .values()
            .map(|slot| slot.lock().history.len())
            .sum();
        let avg_operations_per_session = if total_sessions > 0 {
            total_operations as f64 / total_sessions as f64
        } else {
            0.0
        };

        EngineStats {
            total_sessions,
            total_operations,
            avg_operations_per_session,
        }
    }

    /// Number of sessions in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Check if the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Run `f` on the session's state under its lock, creating the session
    /// if needed.
    fn with_session<R>(&self, session: &SessionId, f: impl FnOnce(&mut DocumentState) -> R) -> R {
        match self.try_with_session(session, |state| Ok::<R, Infallible>(f(state))) {
            Ok(out) => out,
            Err(never) => match never {},
        }
    }

    /// Like [`with_session`](Self::with_session), but a new session is only
    /// inserted into the table if `f` succeeds.
    fn try_with_session<R, E>(
        &self,
        session: &SessionId,
        f: impl FnOnce(&mut DocumentState) -> Result<R, E>,
    ) -> Result<R, E> {
        {
            let sessions = self.sessions.read();
            if let Some(slot) = sessions.get(session) {
                return f(&mut slot.lock());
            }
        }

        let mut sessions = self.sessions.write();
        // Another caller may have created it between the two locks.
        if let Some(slot) = sessions.get_mut(session) {
            return f(slot.get_mut());
        }

        let mut state = DocumentState::default();
        let out = f(&mut state)?;
        sessions.insert(session.clone(), Mutex::new(state));
        tracing::debug!(session = %session, "Created document");
        Ok(out)
    }
}

/// Errors returned by history-dependent store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No document exists for the session
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    /// Operations after the requested version were dropped from history
    #[error("history truncated: requested version {requested}, oldest retained {oldest}")]
    HistoryTruncated {
        /// Requested base version
        requested: u64,
        /// Oldest base version still served
        oldest: u64,
    },
    /// The requested version has not been reached yet
    #[error("version {requested} is ahead of current version {current}")]
    VersionAhead {
        /// Requested base version
        requested: u64,
        /// Current document version
        current: u64,
    },
}
