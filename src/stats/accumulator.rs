//! Incremental merging of per-batch contributions.
//!
//! Every estimator keeps a running accumulator and folds each batch's partial
//! contribution into it field by field:
//!
//! - numeric fields add,
//! - [`CappedSeries`] appends until a hard capacity, then silently drops
//!   (first-come-first-kept, not a sliding window),
//! - [`TrailingWindow`] keeps only the most recent items (used for the chain
//!   trace, which plots the latest states).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fold a contribution into a running total.
pub trait Merge<Rhs = Self> {
    /// Merge `other` into `self`.
    fn merge(&mut self, other: Rhs);
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

impl Merge for f64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

/// Append-only sequence with a hard capacity.
///
/// Once `len() == capacity`, later items are dropped and counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CappedSeries<T> {
    items: Vec<T>,
    capacity: usize,
    dropped: u64,
}

impl<T> CappedSeries<T> {
    /// Create an empty series holding at most `capacity` items.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Free slots before the cap is reached.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    /// True once the cap has been reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Items offered after the cap was reached.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Retained items in arrival order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// The last `n` retained items (or all of them).
    #[must_use]
    pub fn tail(&self, n: usize) -> &[T] {
        &self.items[self.items.len().saturating_sub(n)..]
    }
}

impl<T> Merge<Vec<T>> for CappedSeries<T> {
    fn merge(&mut self, other: Vec<T>) {
        let offered = other.len();
        let keep = offered.min(self.remaining());
        if keep < offered {
            if self.dropped == 0 {
                tracing::debug!(
                    capacity = self.capacity,
                    "sequence cap reached, later items are dropped"
                );
            }
            self.dropped += (offered - keep) as u64;
        }
        self.items.extend(other.into_iter().take(keep));
    }
}

/// Bounded window over the most recent items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> TrailingWindow<T> {
    /// Create an empty window of the given size.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of items currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Push a single item, evicting the oldest when full.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Merge<Vec<T>> for TrailingWindow<T> {
    fn merge(&mut self, other: Vec<T>) {
        for item in other {
            self.push(item);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Falsification: a capped series never exceeds its capacity and keeps a prefix.
        #[test]
        fn prop_capped_series_prefix(cap in 0usize..50, batches in prop::collection::vec(0usize..20, 0..10)) {
            let mut series = CappedSeries::new(cap);
            let mut all = Vec::new();
            let mut next = 0u32;
            for size in batches {
                let batch: Vec<u32> = (next..next + size as u32).collect();
                next += size as u32;
                all.extend(batch.iter().copied());
                series.merge(batch);
            }
            prop_assert!(series.len() <= cap);
            prop_assert_eq!(series.as_slice(), &all[..series.len()]);
            prop_assert_eq!(series.len() as u64 + series.dropped(), all.len() as u64);
        }
    }
}
