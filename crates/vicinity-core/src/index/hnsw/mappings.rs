//! External id <-> internal index mapping.
//!
//! External ids are caller-assigned u64s; internally nodes are dense indices
//! into the adjacency and vector arenas. The forward map only holds live
//! ids, so a removed id can be re-inserted later under a fresh internal
//! index; the reverse side is a dense `Vec` that keeps tombstoned entries in
//! place (internal indices are never reused).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::layer::NodeId;

/// Bidirectional id mapping with dense internal indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct IdMappings {
    /// Live external ids only.
    id_to_idx: FxHashMap<u64, NodeId>,
    /// Dense, append-only; index = internal node id.
    idx_to_id: Vec<u64>,
}

impl IdMappings {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a live id, returning its new internal index.
    /// Returns `None` if the id is already live.
    pub(crate) fn register(&mut self, id: u64) -> Option<NodeId> {
        if self.id_to_idx.contains_key(&id) {
            return None;
        }
        let idx = self.idx_to_id.len();
        self.id_to_idx.insert(id, idx);
        self.idx_to_id.push(id);
        Some(idx)
    }

    /// Unregisters a live id, returning the internal index it occupied.
    /// The reverse entry stays in place as a tombstone.
    pub(crate) fn remove(&mut self, id: u64) -> Option<NodeId> {
        self.id_to_idx.remove(&id)
    }

    pub(crate) fn get_idx(&self, id: u64) -> Option<NodeId> {
        self.id_to_idx.get(&id).copied()
    }

    pub(crate) fn get_id(&self, idx: NodeId) -> Option<u64> {
        self.idx_to_id.get(idx).copied()
    }

    /// Smallest live internal index, used to re-seat the entry point when
    /// its node is removed.
    pub(crate) fn min_live_idx(&self) -> Option<NodeId> {
        self.id_to_idx.values().copied().min()
    }

    /// Number of live ids.
    pub(crate) fn len(&self) -> usize {
        self.id_to_idx.len()
    }

    /// Total internal indices ever allocated, tombstones included.
    pub(crate) fn allocated(&self) -> usize {
        self.idx_to_id.len()
    }
}
