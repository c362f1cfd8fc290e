//! Generation-based visited set for graph traversal.
//!
//! A byte array indexed by internal node id replaces `HashSet<NodeId>` in
//! the search hot loop: O(1) indexing, contiguous memory, and an addressable
//! byte per node that the prefetcher can hint ahead of use. `clear()` bumps
//! a generation counter instead of zeroing; a full memset happens only every
//! 255 clears.

use super::layer::NodeId;

/// Visited bitmap over internal node ids.
pub(crate) struct VisitedSet {
    data: Vec<u8>,
    generation: u8,
}

impl VisitedSet {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            generation: 1,
        }
    }

    /// Resets the set. O(1) amortized.
    #[allow(dead_code)]
    pub(crate) fn clear(&mut self) {
        if self.generation == u8::MAX {
            self.data.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Marks `id` as visited. Returns `true` if it was not already visited.
    #[inline]
    pub(crate) fn insert(&mut self, id: NodeId) -> bool {
        if id >= self.data.len() {
            self.data.resize(id + 1, 0);
        }
        if self.data[id] == self.generation {
            false
        } else {
            self.data[id] = self.generation;
            true
        }
    }

    /// Address of the byte tracking `id`, for prefetch hints.
    #[inline]
    pub(crate) fn byte_ptr(&self, id: NodeId) -> Option<*const u8> {
        self.data.get(id).map(std::ptr::from_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_clear() {
        let mut vs = VisitedSet::new(16);
        assert!(vs.insert(3));
        assert!(!vs.insert(3));
        vs.clear();
        assert!(vs.insert(3));
    }

    #[test]
    fn grows_on_demand() {
        let mut vs = VisitedSet::new(4);
        assert!(vs.insert(100));
        assert!(!vs.insert(100));
        assert!(vs.byte_ptr(100).is_some());
    }

    #[test]
    fn generation_overflow_resets_cleanly() {
        let mut vs = VisitedSet::new(8);
        for _ in 0..254 {
            vs.clear();
        }
        vs.insert(5);
        vs.clear();
        assert!(vs.insert(5));
    }
}
