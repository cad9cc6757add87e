//! Protocol messages for edit ingress and snapshot broadcast.

use cowrite_core::{DocumentState, Operation, SessionId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// An edit submitted by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditMessage {
    /// Target session
    pub session: SessionId,
    /// Document version the operation was authored against.
    ///
    /// When absent the operation is assumed to be already transformed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
    /// The edit itself
    pub operation: Operation,
}

impl EditMessage {
    /// Create an edit message for an already-transformed operation.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            session: operation.session().clone(),
            base_version: None,
            operation,
        }
    }

    /// Tag the edit with the version it was authored against.
    #[must_use]
    pub fn with_base_version(mut self, version: u64) -> Self {
        self.base_version = Some(version);
        self
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        to_cbor(self)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails, including when the embedded
    /// operation is malformed.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        from_cbor(bytes)
    }

    /// Serialize to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        serde_json::to_string(self).map_err(|e| MessageError::Serialize(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails, including when the embedded
    /// operation is malformed.
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        serde_json::from_str(json).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// A document snapshot broadcast to session participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Session the document belongs to
    pub session: SessionId,
    /// Full document text
    pub content: String,
    /// Document version
    pub version: u64,
    /// The operation that produced this version, as applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<Operation>,
}

impl DocumentSnapshot {
    /// Build a snapshot from a session's state.
    #[must_use]
    pub fn from_state(session: SessionId, state: &DocumentState) -> Self {
        Self {
            session,
            content: state.content.clone(),
            version: state.version,
            last_operation: state.history.back().cloned(),
        }
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        to_cbor(self)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        from_cbor(bytes)
    }

    /// Serialize to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        serde_json::to_string(self).map_err(|e| MessageError::Serialize(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        serde_json::from_str(json).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, MessageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| MessageError::Serialize(e.to_string()))?;
    Ok(bytes)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, MessageError> {
    ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
}

/// Message encoding errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialize(String),
}
