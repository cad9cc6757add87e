//! Operational transformation over linear text.
//!
//! Given two operations authored concurrently against the same document
//! version, [`transform`] rewrites the first so that it keeps its intended
//! effect when applied after the second. All functions here are pure and
//! may be called from any thread.
//!
//! # Ordering
//!
//! Concurrent operations are ranked by a canonical total order: earlier
//! timestamp first, then the lexicographically smaller author, then the
//! operation id. Every node computes the same order for the same pair, so
//! every node resolves the same conflict the same way.
//!
//! # Rules
//!
//! | op \ other | Insert | Delete |
//! |------------|--------|--------|
//! | Insert | shift right if other is before, or at the same spot with priority | shift left by the deleted prefix; swallowed if strictly inside |
//! | Delete | shift right if other is at or before; grow if strictly inside | shift left by the deleted prefix, shrink by the overlap |
//!
//! Retains neither move nor are moved.

use crate::operation::{char_len, Edit, Operation};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which of two concurrent operations is treated as applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    /// The operation wins ties and is considered already applied
    Local,
    /// The operation yields to the other one
    Remote,
}

/// Canonical total order over operations: timestamp, author, then id.
#[must_use]
pub fn canonical_cmp(a: &Operation, b: &Operation) -> Ordering {
    authorship_cmp(a, b).then_with(|| a.id().cmp(&b.id()))
}

/// Priority of `a` relative to `b`.
///
/// Agrees with [`canonical_cmp`] except that operations from the same author
/// at the same instant are both `Local`.
#[must_use]
pub fn priority(a: &Operation, b: &Operation) -> Priority {
    match authorship_cmp(a, b) {
        Ordering::Greater => Priority::Remote,
        Ordering::Less | Ordering::Equal => Priority::Local,
    }
}

/// The (timestamp, author) prefix shared by the canonical order and priority.
fn authorship_cmp(a: &Operation, b: &Operation) -> Ordering {
    a.timestamp()
        .cmp(&b.timestamp())
        .then_with(|| a.author().cmp(b.author()))
}

/// Transform `a` so it can be applied after the concurrent operation `b`.
///
/// Operations from the same author are already causally ordered by the
/// caller, so `a` is returned unchanged with [`Priority::Local`].
#[must_use]
pub fn transform(a: &Operation, b: &Operation) -> (Operation, Priority) {
    if a.author() == b.author() {
        return (a.clone(), Priority::Local);
    }

    let priority = priority(a, b);
    (transform_against(a, b, priority), priority)
}

/// Apply the pairwise transformation rules to `op` against `other`.
///
/// `priority` is `op`'s priority relative to `other` and only matters for
/// two inserts at the same position.
#[must_use]
pub fn transform_against(op: &Operation, other: &Operation, priority: Priority) -> Operation {
    let pos = op.position();
    let other_pos = other.position();

    match (op.edit(), other.edit()) {
        (Edit::Insert { .. }, Edit::Insert { content }) => {
            let yields = other_pos < pos || (other_pos == pos && priority == Priority::Remote);
            if yields {
                op.rebuilt(pos.saturating_add(char_len(content)), op.edit().clone())
            } else {
                op.clone()
            }
        }
        (Edit::Insert { .. }, Edit::Delete { length }) => {
            if other_pos >= pos {
                return op.clone();
            }
            let shift = (*length).min(pos - other_pos);
            // An insertion point strictly inside the deleted range is removed
            // along with it.
            let edit = if pos < other_pos.saturating_add(*length) {
                Edit::Insert {
                    content: String::new(),
                }
            } else {
                op.edit().clone()
            };
            op.rebuilt(pos - shift, edit)
        }
        (Edit::Delete { length }, Edit::Insert { content }) => {
            let inserted = char_len(content);
            if other_pos <= pos {
                op.rebuilt(pos.saturating_add(inserted), op.edit().clone())
            } else if other_pos < pos.saturating_add(*length) {
                op.rebuilt(
                    pos,
                    Edit::Delete {
                        length: length.saturating_add(inserted),
                    },
                )
            } else {
                op.clone()
            }
        }
        (Edit::Delete { length }, Edit::Delete { length: other_length }) => {
            let end = pos.saturating_add(*length);
            let other_end = other_pos.saturating_add(*other_length);
            let overlap = end.min(other_end).saturating_sub(pos.max(other_pos));
            let shift = if other_pos < pos {
                (*other_length).min(pos - other_pos)
            } else {
                0
            };
            op.rebuilt(
                pos.saturating_sub(shift),
                Edit::Delete {
                    length: length.saturating_sub(overlap),
                },
            )
        }
        _ => op.clone(),
    }
}

/// Transform an unordered set of concurrent operations into a sequence
/// that can be applied one after another.
///
/// Operations are sorted into canonical order and each one is transformed
/// against every operation before it. The output is identical for any
/// permutation of the same input.
///
/// Runs in O(n²) transforms, which suits the tens of in-flight operations
/// typical of a collaborative session; large batches should be split.
#[must_use]
pub fn transform_batch(mut ops: Vec<Operation>) -> Vec<Operation> {
    ops.sort_by(canonical_cmp);

    let mut transformed: Vec<Operation> = Vec::with_capacity(ops.len());
    for op in ops {
        let next = transformed
            .iter()
            .fold(op, |acc, prior| transform(&acc, prior).0);
        transformed.push(next);
    }

    tracing::trace!(count = transformed.len(), "Transformed batch");
    transformed
}
