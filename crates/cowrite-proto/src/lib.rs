//! # cowrite Protocol
//!
//! Wire envelopes exchanged with the transport that delivers edits to the
//! engine and broadcasts results back to collaborators.
//!
//! ## Messages
//!
//! - `EditMessage`: An inbound edit, optionally tagged with the document
//!   version it was authored against
//! - `DocumentSnapshot`: The document after an edit was applied
//!
//! Both encode as CBOR for compact transport and JSON for line-oriented
//! tooling.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod messages;

pub use messages::{DocumentSnapshot, EditMessage, MessageError};
