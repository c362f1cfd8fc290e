//! Conjugate graph: feedback-driven shortcut edges.
//!
//! A secondary adjacency over external ids that patches under-connectivity
//! in the main graph. Feedback about a query adds edges from the query's
//! nearest returned node to true neighbors the search missed; at query time
//! those edges act as an extra candidate source merged into the result set.
//!
//! Growth is lazy and unbounded until `soft_capacity` distinct source ids,
//! after which new sources are refused (existing sources keep accepting
//! edges). This is a deliberate approximation; no eviction is attempted.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use super::layer::NodeId;

/// Default soft capacity: distinct source ids before new sources are
/// refused.
pub(crate) const DEFAULT_SOFT_CAPACITY: usize = 100_000;

/// Auxiliary edge set keyed by external id.
pub(crate) struct ConjugateGraph {
    edges: RwLock<FxHashMap<u64, BTreeSet<u64>>>,
    soft_capacity: usize,
}

impl ConjugateGraph {
    pub(crate) fn new() -> Self {
        Self {
            edges: RwLock::new(FxHashMap::default()),
            soft_capacity: DEFAULT_SOFT_CAPACITY,
        }
    }

    /// Records the shortcut `from -> to`. Returns whether the edge was
    /// newly added; self-edges and sources past the soft capacity are
    /// refused.
    pub(crate) fn add_neighbor(&self, from: u64, to: u64) -> bool {
        if from == to {
            return false;
        }
        let mut edges = self.edges.write();
        if !edges.contains_key(&from) && edges.len() >= self.soft_capacity {
            return false;
        }
        edges.entry(from).or_default().insert(to)
    }

    /// Shortcut targets recorded for `id`, in stable ascending order.
    pub(crate) fn neighbors(&self, id: u64) -> Vec<u64> {
        self.edges
            .read()
            .get(&id)
            .map_or_else(Vec::new, |set| set.iter().copied().collect())
    }

    /// Removes every edge touching `id`, both as source and as target.
    pub(crate) fn forget(&self, id: u64) {
        let mut edges = self.edges.write();
        edges.remove(&id);
        for set in edges.values_mut() {
            set.remove(&id);
        }
    }

    /// Merges conjugate candidates into `results` (triples of distance,
    /// internal index, external id): for each returned id, every recorded
    /// shortcut target gets scored by `score` and considered for the top
    /// `k`. Equal distances are broken by internal index, the same rule
    /// the graph traversal applies. Returns how many candidates made the
    /// cut.
    pub(crate) fn enhance(
        &self,
        results: &mut Vec<(f32, NodeId, u64)>,
        k: usize,
        mut score: impl FnMut(u64) -> Option<(f32, NodeId)>,
    ) -> usize {
        let extra: Vec<u64> = {
            let edges = self.edges.read();
            results
                .iter()
                .filter_map(|&(_, _, id)| edges.get(&id))
                .flat_map(|set| set.iter().copied())
                .collect()
        };
        if extra.is_empty() {
            return 0;
        }
        let before: BTreeSet<u64> = results.iter().map(|&(_, _, id)| id).collect();
        for id in extra {
            if before.contains(&id) || results.iter().any(|&(_, _, r)| r == id) {
                continue;
            }
            if let Some((d, idx)) = score(id) {
                results.push((d, idx, id));
            }
        }
        results.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let merged: usize = results
            .iter()
            .take(k)
            .filter(|&&(_, _, id)| !before.contains(&id))
            .count();
        results.truncate(k);
        merged
    }

    /// Snapshot of the edge map, for serialization.
    pub(crate) fn snapshot(&self) -> FxHashMap<u64, BTreeSet<u64>> {
        self.edges.read().clone()
    }

    /// Rebuilds from a snapshot.
    pub(crate) fn from_snapshot(edges: FxHashMap<u64, BTreeSet<u64>>) -> Self {
        Self {
            edges: RwLock::new(edges),
            soft_capacity: DEFAULT_SOFT_CAPACITY,
        }
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.read().values().map(BTreeSet::len).sum()
    }
}
