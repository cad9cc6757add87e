//! Edit operations over linear text.
//!
//! An [`Operation`] is an immutable edit intent authored against a specific
//! document version. Positions and lengths count Unicode scalar values, not
//! bytes, so multi-byte text is never split mid-character.
//!
//! Operations arriving over the wire are decoded through [`RawOperation`],
//! which rejects malformed shapes (an insert without content, a delete
//! without a length) before an `Operation` ever exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the collaborator who authored an operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    /// Create a new author identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AuthorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for AuthorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a collaboration session (one document per session).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpKind {
    /// Splice text into the document
    Insert,
    /// Remove a range of characters
    Delete,
    /// Advance past characters without changing them
    Retain,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Insert => write!(f, "insert"),
            OpKind::Delete => write!(f, "delete"),
            OpKind::Retain => write!(f, "retain"),
        }
    }
}

/// Kind-specific payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Edit {
    /// Insert `content` at the operation's position
    Insert {
        /// Text to insert
        content: String,
    },
    /// Delete `length` characters starting at the operation's position
    Delete {
        /// Number of characters removed
        length: usize,
    },
    /// Leave `length` characters untouched
    Retain {
        /// Number of characters skipped
        length: usize,
    },
}

impl Edit {
    /// The kind of this edit.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Edit::Insert { .. } => OpKind::Insert,
            Edit::Delete { .. } => OpKind::Delete,
            Edit::Retain { .. } => OpKind::Retain,
        }
    }
}

/// An atomic, immutable edit intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawOperation", into = "RawOperation")]
pub struct Operation {
    id: Uuid,
    edit: Edit,
    position: usize,
    author: AuthorId,
    timestamp: DateTime<Utc>,
    session: SessionId,
}

impl Operation {
    fn new(session: SessionId, author: AuthorId, position: usize, edit: Edit) -> Self {
        Self {
            id: Uuid::new_v4(),
            edit,
            position,
            author,
            timestamp: Utc::now(),
            session,
        }
    }

    /// Create an insertion of `content` at character offset `position`.
    #[must_use]
    pub fn insert(
        session: impl Into<SessionId>,
        author: impl Into<AuthorId>,
        position: usize,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            session.into(),
            author.into(),
            position,
            Edit::Insert {
                content: content.into(),
            },
        )
    }

    /// Create a deletion of `length` characters starting at `position`.
    #[must_use]
    pub fn delete(
        session: impl Into<SessionId>,
        author: impl Into<AuthorId>,
        position: usize,
        length: usize,
    ) -> Self {
        Self::new(
            session.into(),
            author.into(),
            position,
            Edit::Delete { length },
        )
    }

    /// Create a retain (cursor advance) of `length` characters at `position`.
    #[must_use]
    pub fn retain(
        session: impl Into<SessionId>,
        author: impl Into<AuthorId>,
        position: usize,
        length: usize,
    ) -> Self {
        Self::new(
            session.into(),
            author.into(),
            position,
            Edit::Retain { length },
        )
    }

    /// Replace the authoring timestamp assigned at construction.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the identifier assigned at construction.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Copy of this operation moved to `position` with a new payload.
    ///
    /// Identity, author, timestamp and session are preserved.
    pub(crate) fn rebuilt(&self, position: usize, edit: Edit) -> Self {
        Self {
            id: self.id,
            edit,
            position,
            author: self.author.clone(),
            timestamp: self.timestamp,
            session: self.session.clone(),
        }
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Kind of edit.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        self.edit.kind()
    }

    /// Kind-specific payload.
    #[must_use]
    pub fn edit(&self) -> &Edit {
        &self.edit
    }

    /// Character offset the operation was authored against.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Inserted text, for inserts only.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.edit {
            Edit::Insert { content } => Some(content),
            Edit::Delete { .. } | Edit::Retain { .. } => None,
        }
    }

    /// Affected character count, for deletes and retains.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self.edit {
            Edit::Delete { length } | Edit::Retain { length } => Some(length),
            Edit::Insert { .. } => None,
        }
    }

    /// Originating collaborator.
    #[must_use]
    pub fn author(&self) -> &AuthorId {
        &self.author
    }

    /// Wall-clock time of authorship.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Target session.
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Apply this operation to `text`, returning the edited text.
    ///
    /// Out-of-range positions and lengths are clamped to the end of the
    /// text; this never panics.
    #[must_use]
    pub fn apply_to(&self, text: &str) -> String {
        match &self.edit {
            Edit::Insert { content } => {
                let at = byte_offset(text, self.position);
                let mut out = String::with_capacity(text.len() + content.len());
                out.push_str(&text[..at]);
                out.push_str(content);
                out.push_str(&text[at..]);
                out
            }
            Edit::Delete { length } => {
                let start = byte_offset(text, self.position);
                let end = start + byte_offset(&text[start..], *length);
                let mut out = String::with_capacity(text.len() - (end - start));
                out.push_str(&text[..start]);
                out.push_str(&text[end..]);
                out
            }
            Edit::Retain { .. } => text.to_string(),
        }
    }
}

/// Number of characters in `text`.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the character at index `chars`, clamped to the text end.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

/// Wire representation of an [`Operation`] with every field optional
/// where the kind allows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOperation {
    /// Unique identifier
    pub id: Uuid,
    /// Edit kind
    pub kind: OpKind,
    /// Character offset
    pub position: usize,
    /// Inserted text (inserts only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Affected character count (deletes and retains)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Originating collaborator
    pub author: AuthorId,
    /// Wall-clock time of authorship
    pub timestamp: DateTime<Utc>,
    /// Target session
    pub session: SessionId,
}

impl TryFrom<RawOperation> for Operation {
    type Error = OperationError;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        let edit = match raw.kind {
            OpKind::Insert => {
                if raw.length.is_some() {
                    return Err(OperationError::UnexpectedLength { id: raw.id });
                }
                let content = raw
                    .content
                    .ok_or(OperationError::MissingContent { id: raw.id })?;
                Edit::Insert { content }
            }
            OpKind::Delete => {
                if raw.content.is_some() {
                    return Err(OperationError::UnexpectedContent {
                        id: raw.id,
                        kind: raw.kind,
                    });
                }
                let length = raw
                    .length
                    .ok_or(OperationError::MissingLength { id: raw.id })?;
                Edit::Delete { length }
            }
            OpKind::Retain => {
                if raw.content.is_some() {
                    return Err(OperationError::UnexpectedContent {
                        id: raw.id,
                        kind: raw.kind,
                    });
                }
                Edit::Retain {
                    length: raw.length.unwrap_or(0),
                }
            }
        };

        Ok(Self {
            id: raw.id,
            edit,
            position: raw.position,
            author: raw.author,
            timestamp: raw.timestamp,
            session: raw.session,
        })
    }
}

impl From<Operation> for RawOperation {
    fn from(op: Operation) -> Self {
        let kind = op.kind();
        let (content, length) = match op.edit {
            Edit::Insert { content } => (Some(content), None),
            Edit::Delete { length } | Edit::Retain { length } => (None, Some(length)),
        };

        Self {
            id: op.id,
            kind,
            position: op.position,
            content,
            length,
            author: op.author,
            timestamp: op.timestamp,
            session: op.session,
        }
    }
}

/// Errors raised when constructing an operation from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// Insert without text
    #[error("insert operation {id} has no content")]
    MissingContent {
        /// Offending operation
        id: Uuid,
    },
    /// Delete without a length
    #[error("delete operation {id} has no length")]
    MissingLength {
        /// Offending operation
        id: Uuid,
    },
    /// Content on a delete or retain
    #[error("{kind} operation {id} must not carry content")]
    UnexpectedContent {
        /// Offending operation
        id: Uuid,
        /// Its kind
        kind: OpKind,
    },
    /// Length on an insert
    #[error("insert operation {id} must not carry a length")]
    UnexpectedLength {
        /// Offending operation
        id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: OpKind, content: Option<&str>, length: Option<usize>) -> RawOperation {
        RawOperation {
            id: Uuid::nil(),
            kind,
            position: 0,
            content: content.map(str::to_string),
            length,
            author: AuthorId::new("alice"),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            session: SessionId::new("s1"),
        }
    }

    #[test]
    fn insert_splices_at_char_offset() {
        let op = Operation::insert("s1", "alice", 2, "XY");
        assert_eq!(op.apply_to("héllo"), "héXYllo");
    }

    #[test]
    fn insert_past_end_appends() {
        let op = Operation::insert("s1", "alice", 42, "!");
        assert_eq!(op.apply_to("hi"), "hi!");
    }

    #[test]
    fn delete_removes_half_open_range() {
        let op = Operation::delete("s1", "alice", 1, 3);
        assert_eq!(op.apply_to("abcdef"), "aef");
    }

    #[test]
    fn delete_clamps_to_text_end() {
        let op = Operation::delete("s1", "alice", 4, 100);
        assert_eq!(op.apply_to("abcdef"), "abcd");

        let op = Operation::delete("s1", "alice", 10, 3);
        assert_eq!(op.apply_to("abc"), "abc");
    }

    #[test]
    fn delete_respects_multibyte_chars() {
        let op = Operation::delete("s1", "alice", 1, 2);
        assert_eq!(op.apply_to("añ€z"), "az");
    }

    #[test]
    fn retain_leaves_text_untouched() {
        let op = Operation::retain("s1", "alice", 0, 3);
        assert_eq!(op.apply_to("abc"), "abc");
        assert_eq!(op.length(), Some(3));
        assert_eq!(op.content(), None);
    }

    #[test]
    fn raw_insert_without_content_is_rejected() {
        let err = Operation::try_from(raw(OpKind::Insert, None, None)).unwrap_err();
        assert_eq!(err, OperationError::MissingContent { id: Uuid::nil() });
    }

    #[test]
    fn raw_delete_without_length_is_rejected() {
        let err = Operation::try_from(raw(OpKind::Delete, None, None)).unwrap_err();
        assert_eq!(err, OperationError::MissingLength { id: Uuid::nil() });
    }

    #[test]
    fn raw_delete_with_content_is_rejected() {
        let err = Operation::try_from(raw(OpKind::Delete, Some("x"), Some(1))).unwrap_err();
        assert!(matches!(err, OperationError::UnexpectedContent { .. }));
    }

    #[test]
    fn raw_retain_defaults_length() {
        let op = Operation::try_from(raw(OpKind::Retain, None, None)).unwrap();
        assert_eq!(op.length(), Some(0));
    }

    #[test]
    fn json_shape_uses_optional_fields() {
        let op = Operation::insert("s1", "alice", 3, "hi").with_id(Uuid::nil());
        let json = serde_json::to_value(&op).unwrap();

        assert_eq!(json["kind"], "insert");
        assert_eq!(json["content"], "hi");
        assert!(json.get("length").is_none());

        let decoded: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn json_missing_length_fails_to_decode() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "kind": "delete",
            "position": 1,
            "author": "bob",
            "timestamp": "2024-01-01T00:00:00Z",
            "session": "s1",
        });

        let result: Result<Operation, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }
}
