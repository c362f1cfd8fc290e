//! A single layer of the proximity graph.
//!
//! Adjacency is arena-indexed: neighbor lists are `Vec<NodeId>` slots keyed
//! by internal index, one `RwLock` per node. The per-node lock is the only
//! write serialization point in the whole graph; it is held for a single
//! list read or replace, never across distance computations.

use parking_lot::RwLock;

/// Internal node index into the adjacency and vector arenas.
pub(crate) type NodeId = usize;

/// One layer's adjacency arena.
#[derive(Debug)]
pub(crate) struct Layer {
    neighbors: Vec<RwLock<Vec<NodeId>>>,
}

impl Layer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            neighbors: (0..capacity).map(|_| RwLock::new(Vec::new())).collect(),
        }
    }

    /// Grows the arena to cover `node_id`.
    pub(crate) fn ensure_capacity(&mut self, node_id: NodeId) {
        while self.neighbors.len() <= node_id {
            self.neighbors.push(RwLock::new(Vec::new()));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbor list of `node_id`, cloned out from under the node lock.
    pub(crate) fn get(&self, node_id: NodeId) -> Vec<NodeId> {
        if node_id < self.neighbors.len() {
            self.neighbors[node_id].read().clone()
        } else {
            Vec::new()
        }
    }

    /// Replaces the neighbor list of `node_id`.
    pub(crate) fn set(&self, node_id: NodeId, list: Vec<NodeId>) {
        if node_id < self.neighbors.len() {
            *self.neighbors[node_id].write() = list;
        }
    }

    /// Read-modify-write of one neighbor list under a single lock
    /// acquisition. Returns the (old, new) lists so the caller can diff
    /// them for the reverse index.
    pub(crate) fn update<F>(&self, node_id: NodeId, f: F) -> Option<(Vec<NodeId>, Vec<NodeId>)>
    where
        F: FnOnce(&mut Vec<NodeId>),
    {
        let slot = self.neighbors.get(node_id)?;
        let mut guard = slot.write();
        let old = guard.clone();
        f(&mut guard);
        Some((old, guard.clone()))
    }

    /// Rebuilds a layer from serialized adjacency.
    pub(crate) fn from_lists(lists: Vec<Vec<NodeId>>) -> Self {
        Self {
            neighbors: lists.into_iter().map(RwLock::new).collect(),
        }
    }

    /// Snapshot of all neighbor lists, for serialization.
    pub(crate) fn to_lists(&self) -> Vec<Vec<NodeId>> {
        self.neighbors.iter().map(|l| l.read().clone()).collect()
    }
}
