//! Total-order f32 wrapper for use in `BinaryHeap`.
//!
//! Heap candidates carry raw distances; `f32::total_cmp` gives IEEE 754
//! total ordering so Ord/Eq stay consistent even if a NaN slips in from a
//! degenerate metric, preventing heap corruption mid-search.

use std::cmp::Ordering;

/// Distance wrapper implementing `Ord` via `f32::total_cmp`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderedDist(pub f32);

impl PartialEq for OrderedDist {
    fn eq(&self, other: &Self) -> bool {
        // Bit comparison keeps Eq consistent with total_cmp.
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedDist {}

impl PartialOrd for OrderedDist {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedDist {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
