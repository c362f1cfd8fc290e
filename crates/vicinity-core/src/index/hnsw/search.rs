//! Layered greedy search.
//!
//! Two traversal primitives cover every read path and the construction-time
//! candidate search:
//!
//! - [`SearchEngine::descend`]: single-best-neighbor hill-climbing through
//!   the upper layers.
//! - [`SearchEngine::search_layer`]: ef-bounded best-first expansion at one
//!   layer, maintaining a visited bitmap, a min-heap frontier and a bounded
//!   max-heap of the current best candidates.
//!
//! Tombstoned nodes stay traversable as routing waypoints but never enter a
//! result heap. The vector-arena read lock and the tombstone read guard are
//! acquired once per call by the caller and passed down; the inner loop
//! takes no locks.

use roaring::RoaringBitmap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::graph::ProximityGraph;
use super::layer::NodeId;
use super::ordered_float::OrderedDist;
use super::prefetch::Prefetcher;
use super::vector_store::VectorGuard;
use super::visited::VisitedSet;
use crate::distance::DistanceMetric;

/// Read-only traversal over a [`ProximityGraph`].
pub(crate) struct SearchEngine<'a> {
    pub(crate) graph: &'a ProximityGraph,
    pub(crate) metric: DistanceMetric,
}

impl SearchEngine<'_> {
    /// Full k-NN traversal: hill-climb from the entry point down to layer 1,
    /// then an ef-bounded best-first search at layer 0. Returns up to `ef`
    /// live candidates sorted ascending by `(distance, internal index)`.
    pub(crate) fn knn(
        &self,
        vectors: &VectorGuard<'_>,
        tombstones: &RoaringBitmap,
        query: &[f32],
        ef: usize,
        skip_ratio: f32,
        prefetcher: &Prefetcher,
    ) -> Vec<(f32, NodeId)> {
        let Some(entry) = self.graph.entry_point() else {
            return Vec::new();
        };
        let ep = self.descend(vectors, query, entry, self.graph.max_layer(), 1);
        self.search_layer(vectors, tombstones, query, &[ep], ef, 0, skip_ratio, prefetcher)
    }

    /// Range traversal: same descent, then threshold-bounded expansion at
    /// layer 0. `ef` acts as an exploration floor so near-threshold regions
    /// are not abandoned too early.
    pub(crate) fn range(
        &self,
        vectors: &VectorGuard<'_>,
        tombstones: &RoaringBitmap,
        query: &[f32],
        threshold: f32,
        ef: usize,
        prefetcher: &Prefetcher,
    ) -> Vec<(f32, NodeId)> {
        let Some(entry) = self.graph.entry_point() else {
            return Vec::new();
        };
        let ep = self.descend(vectors, query, entry, self.graph.max_layer(), 1);
        self.search_layer_range(vectors, tombstones, query, ep, threshold, ef, prefetcher)
    }

    /// Hill-climbs from `entry` through layers `from_layer..=to_layer`
    /// (descending), moving to the neighbor closest to `query` until no
    /// neighbor improves.
    pub(crate) fn descend(
        &self,
        vectors: &VectorGuard<'_>,
        query: &[f32],
        entry: NodeId,
        from_layer: usize,
        to_layer: usize,
    ) -> NodeId {
        let mut best = entry;
        if from_layer < to_layer {
            return best;
        }
        let mut best_dist = self.metric.distance(query, vectors.get(best));
        for layer in (to_layer..=from_layer).rev() {
            loop {
                let mut improved = false;
                for n in self.graph.neighbors(layer, best) {
                    let d = self.metric.distance(query, vectors.get(n));
                    if d < best_dist {
                        best = n;
                        best_dist = d;
                        improved = true;
                    }
                }
                if !improved {
                    break;
                }
            }
        }
        best
    }

    /// Bounded best-first search at one layer.
    ///
    /// Expansion stops when the nearest frontier candidate is farther than
    /// `worst_accepted * skip_ratio` with a full best-heap; `skip_ratio = 1`
    /// is the standard termination rule, smaller values trade recall for
    /// speed by cutting low-value expansions early.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn search_layer(
        &self,
        vectors: &VectorGuard<'_>,
        tombstones: &RoaringBitmap,
        query: &[f32],
        entry_points: &[NodeId],
        ef: usize,
        layer: usize,
        skip_ratio: f32,
        prefetcher: &Prefetcher,
    ) -> Vec<(f32, NodeId)> {
        let mut visited = VisitedSet::new(self.graph.node_capacity());
        let mut frontier: BinaryHeap<Reverse<(OrderedDist, NodeId)>> = BinaryHeap::new();
        let mut best: BinaryHeap<(OrderedDist, NodeId)> = BinaryHeap::new();

        for &ep in entry_points {
            if !visited.insert(ep) {
                continue;
            }
            let d = self.metric.distance(query, vectors.get(ep));
            frontier.push(Reverse((OrderedDist(d), ep)));
            if !tombstones.contains(ep as u32) {
                best.push((OrderedDist(d), ep));
            }
        }

        while let Some(Reverse((OrderedDist(c_dist), c_node))) = frontier.pop() {
            let worst = best.peek().map_or(f32::MAX, |r| r.0 .0);
            if best.len() >= ef && c_dist > worst * skip_ratio {
                break;
            }

            let neighbors = self.graph.neighbors(layer, c_node);
            for (i, &n) in neighbors.iter().enumerate() {
                prefetcher.hint_codes(vectors, &neighbors, i);
                prefetcher.hint_visited(&visited, &neighbors, i);
                if !visited.insert(n) {
                    continue;
                }
                let d = self.metric.distance(query, vectors.get(n));
                let worst = best.peek().map_or(f32::MAX, |r| r.0 .0);
                if best.len() < ef || d < worst {
                    frontier.push(Reverse((OrderedDist(d), n)));
                    if !tombstones.contains(n as u32) {
                        best.push((OrderedDist(d), n));
                        if best.len() > ef {
                            best.pop();
                        }
                    }
                }
            }
        }

        let mut out: Vec<(f32, NodeId)> = best.into_iter().map(|(d, n)| (d.0, n)).collect();
        out.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        out
    }

    /// Threshold-bounded expansion at layer 0 for range queries: the fixed-k
    /// heap is replaced by the acceptance test `distance <= threshold`.
    #[allow(clippy::too_many_arguments)]
    fn search_layer_range(
        &self,
        vectors: &VectorGuard<'_>,
        tombstones: &RoaringBitmap,
        query: &[f32],
        entry: NodeId,
        threshold: f32,
        ef: usize,
        prefetcher: &Prefetcher,
    ) -> Vec<(f32, NodeId)> {
        let mut visited = VisitedSet::new(self.graph.node_capacity());
        let mut frontier: BinaryHeap<Reverse<(OrderedDist, NodeId)>> = BinaryHeap::new();
        let mut accepted: Vec<(f32, NodeId)> = Vec::new();
        let mut expanded = 0usize;

        visited.insert(entry);
        let d = self.metric.distance(query, vectors.get(entry));
        frontier.push(Reverse((OrderedDist(d), entry)));
        if d <= threshold && !tombstones.contains(entry as u32) {
            accepted.push((d, entry));
        }

        while let Some(Reverse((OrderedDist(c_dist), c_node))) = frontier.pop() {
            if c_dist > threshold && expanded >= ef {
                break;
            }
            expanded += 1;

            let neighbors = self.graph.neighbors(0, c_node);
            for (i, &n) in neighbors.iter().enumerate() {
                prefetcher.hint_codes(vectors, &neighbors, i);
                prefetcher.hint_visited(&visited, &neighbors, i);
                if !visited.insert(n) {
                    continue;
                }
                let d = self.metric.distance(query, vectors.get(n));
                frontier.push(Reverse((OrderedDist(d), n)));
                if d <= threshold && !tombstones.contains(n as u32) {
                    accepted.push((d, n));
                }
            }
        }

        accepted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        accepted
    }
}
