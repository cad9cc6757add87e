//! # cowrite Core
//!
//! Operational transformation engine for collaborative plain-text editing.
//!
//! This crate provides:
//! - An immutable [`Operation`] model (insert, delete, retain) with
//!   fail-fast validation of wire input
//! - Pure transform functions with a deterministic canonical order, so
//!   every node resolves concurrent edits identically
//! - A [`DocumentStore`] holding one document per session with bounded
//!   history and idle-session reclamation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod engine;
pub mod operation;
pub mod transform;

pub use config::EngineConfig;
pub use document::{DocumentState, DocumentStore, EngineStats, StoreError};
pub use engine::Engine;
pub use operation::{AuthorId, Edit, OpKind, Operation, OperationError, RawOperation, SessionId};
pub use transform::{canonical_cmp, transform, transform_batch, Priority};
