//! Property-based tests for transform convergence.

use chrono::{DateTime, TimeZone, Utc};
use cowrite_core::{transform, transform_batch, Operation, Priority, RawOperation};
use proptest::prelude::*;
use uuid::Uuid;

// =============================================================================
// Strategies
// =============================================================================

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn base_text() -> impl Strategy<Value = String> {
    "[a-z]{0,16}"
}

/// An operation valid against a document of `len` characters.
fn edit_for(len: usize, author: &'static str) -> impl Strategy<Value = Operation> {
    let insert = (0..=len, "[A-Z]{1,4}", 0i64..4).prop_map(move |(pos, content, secs)| {
        Operation::insert("doc", author, pos, content).with_timestamp(at(secs))
    });
    let delete = (0..=len, 0..=len, 0i64..4).prop_map(move |(pos, length, secs)| {
        let length = length.min(len - pos);
        Operation::delete("doc", author, pos, length).with_timestamp(at(secs))
    });
    let retain = (0..=len, 0i64..4).prop_map(move |(pos, secs)| {
        Operation::retain("doc", author, pos, len - pos).with_timestamp(at(secs))
    });

    prop_oneof![3 => insert, 3 => delete, 1 => retain]
}

fn concurrent_pair() -> impl Strategy<Value = (String, Operation, Operation)> {
    base_text().prop_flat_map(|base| {
        let len = base.chars().count();
        (Just(base), edit_for(len, "alice"), edit_for(len, "bob"))
    })
}

/// Any operation at all, including positions far outside the document.
fn wild_op(author: &'static str) -> impl Strategy<Value = Operation> {
    let insert = (any::<usize>(), "[a-z]{0,3}").prop_map(move |(pos, content)| {
        Operation::insert("doc", author, pos, content).with_timestamp(at(0))
    });
    let delete = (any::<usize>(), any::<usize>()).prop_map(move |(pos, length)| {
        Operation::delete("doc", author, pos, length).with_timestamp(at(0))
    });
    prop_oneof![insert, delete]
}

/// A base text, a batch of concurrent edits, and a permutation of it.
fn batch() -> impl Strategy<Value = (String, Vec<Operation>, Vec<Operation>)> {
    base_text()
        .prop_flat_map(|base| {
            let len = base.chars().count();
            let op = prop_oneof![
                edit_for(len, "alice"),
                edit_for(len, "bob"),
                edit_for(len, "carol"),
            ];
            (Just(base), prop::collection::vec(op, 0..7))
        })
        .prop_flat_map(|(base, ops)| (Just(base), Just(ops.clone()), Just(ops).prop_shuffle()))
}

fn apply_all<'a>(base: &str, ops: impl IntoIterator<Item = &'a Operation>) -> String {
    ops.into_iter()
        .fold(base.to_string(), |text, op| op.apply_to(&text))
}

// =============================================================================
// Pairwise properties
// =============================================================================

proptest! {
    #[test]
    fn pairwise_transform_converges((base, a, b) in concurrent_pair()) {
        let (b_prime, _) = transform(&b, &a);
        let (a_prime, _) = transform(&a, &b);

        let left = apply_all(&base, [&a, &b_prime]);
        let right = apply_all(&base, [&b, &a_prime]);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn priorities_are_antisymmetric((_, a, b) in concurrent_pair()) {
        let (_, pa) = transform(&a, &b);
        let (_, pb) = transform(&b, &a);

        prop_assert_ne!(pa, pb);
        let a_first = (a.timestamp(), a.author()) < (b.timestamp(), b.author());
        prop_assert_eq!(pa == Priority::Local, a_first);
    }

    #[test]
    fn same_author_is_identity((_, a, b) in concurrent_pair()) {
        let raw: RawOperation = b.into();
        let b = Operation::try_from(RawOperation {
            author: a.author().clone(),
            ..raw
        })
        .unwrap();

        let (out, priority) = transform(&a, &b);
        prop_assert_eq!(out, a);
        prop_assert_eq!(priority, Priority::Local);
    }

    #[test]
    fn transform_never_underflows(a in wild_op("alice"), b in wild_op("bob")) {
        let (out, _) = transform(&a, &b);
        prop_assert_eq!(out.id(), a.id());
        prop_assert_eq!(out.kind(), a.kind());
    }
}

// =============================================================================
// Batch properties
// =============================================================================

proptest! {
    #[test]
    fn batch_is_order_independent((base, ops, shuffled) in batch()) {
        let expected = transform_batch(ops);
        let actual = transform_batch(shuffled);

        prop_assert_eq!(apply_all(&base, &expected), apply_all(&base, &actual));
        prop_assert_eq!(expected, actual);
    }
}

#[test]
fn batch_preserves_ids() {
    let ops: Vec<_> = (0..4u128)
        .map(|i| {
            Operation::insert("doc", if i % 2 == 0 { "a" } else { "b" }, 0, "x")
                .with_id(Uuid::from_u128(i))
                .with_timestamp(at(4 - i64::try_from(i).unwrap()))
        })
        .collect();

    let mut ids: Vec<_> = transform_batch(ops).iter().map(Operation::id).collect();
    ids.sort();
    assert_eq!(ids, (0..4u128).map(Uuid::from_u128).collect::<Vec<_>>());
}
