//! Reduction primitives shared by every metric accumulator.
//!
//! Aggregation is reduction-only: accumulators change exclusively through
//! [`Merge::merge`]. The helpers here cover the three shapes that recur across
//! categories: optional slots, summed counter maps and maps of mergeable values.

use std::collections::BTreeMap;
use std::ops::AddAssign;

/// A value that can absorb another value of the same type.
///
/// Implementations must leave `self` unchanged when `other` is the default
/// value, and must not panic on any input.
pub trait Merge {
    fn merge(&mut self, other: &Self);
}

/// Merges `other` into `slot`, allocating a default accumulator first when
/// only `other` is present.
///
/// An absent `other` is a no-op. This is the `Option` combinator every
/// category slot in [`crate::Metrics`] goes through.
pub fn merge_slot<T: Merge + Default>(slot: &mut Option<T>, other: Option<&T>) {
    if let Some(other) = other {
        slot.get_or_insert_with(T::default).merge(other);
    }
}

/// Adds every value of `from` into the entry with the same key in `into`.
pub fn sum_by_key<V>(into: &mut BTreeMap<String, V>, from: &BTreeMap<String, V>)
where
    V: Copy + Default + AddAssign,
{
    for (key, value) in from {
        *into.entry(key.clone()).or_default() += *value;
    }
}

/// Merges every value of `from` into the entry with the same key in `into`.
pub fn merge_by_key<V>(into: &mut BTreeMap<String, V>, from: &BTreeMap<String, V>)
where
    V: Merge + Default,
{
    for (key, value) in from {
        into.entry(key.clone()).or_default().merge(value);
    }
}

/// Inserts or overwrites every entry of `from` into `into` (last writer wins).
pub fn overwrite_by_key<V: Clone>(into: &mut BTreeMap<String, V>, from: &BTreeMap<String, V>) {
    for (key, value) in from {
        into.insert(key.clone(), value.clone());
    }
}
