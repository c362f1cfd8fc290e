//! Incremental graph construction.
//!
//! One node at a time: draw a random top layer, hill-climb down from the
//! current entry point, run an `ef_construction`-wide candidate search per
//! assigned layer, diversify the candidates and link bidirectionally.
//! Neighbor lists are re-pruned with the same diversification heuristic
//! whenever a back-link pushes them over the layer bound.

use std::sync::atomic::{AtomicU64, Ordering};

use super::graph::ProximityGraph;
use super::layer::NodeId;
use super::prefetch::Prefetcher;
use super::search::SearchEngine;
use super::vector_store::{VectorGuard, VectorStore};
use crate::distance::DistanceMetric;

/// Hard cap on layer count. The geometric layer distribution makes layers
/// beyond this unreachable for any realistic collection size.
const MAX_LAYERS: usize = 16;

/// Write-side companion to [`SearchEngine`].
pub(crate) struct GraphBuilder<'a> {
    pub(crate) graph: &'a ProximityGraph,
    pub(crate) store: &'a VectorStore,
    pub(crate) metric: DistanceMetric,
    pub(crate) max_degree: usize,
    pub(crate) ef_construction: usize,
    pub(crate) rng: &'a AtomicU64,
    pub(crate) prefetcher: Prefetcher,
}

impl GraphBuilder<'_> {
    /// Inserts an already-stored vector slot into the graph and returns its
    /// assigned top layer. The vector for `node` must be in the arena before
    /// this call.
    pub(crate) fn insert(&self, node: NodeId) -> usize {
        let top = self.random_layer();
        self.graph.ensure_node(node, top);
        if self.graph.try_init_entry(node, top) {
            return top;
        }

        let engine = SearchEngine {
            graph: self.graph,
            metric: self.metric,
        };
        {
            let vectors = self.store.read();
            let tombstones = self.graph.tombstones();
            let query = vectors.get(node);

            let Some(entry) = self.graph.entry_point() else {
                return top;
            };
            let max_layer = self.graph.max_layer();
            let mut ep = entry;
            if top < max_layer {
                ep = engine.descend(&vectors, query, entry, max_layer, top + 1);
            }

            for layer in (0..=top.min(max_layer)).rev() {
                let candidates = engine.search_layer(
                    &vectors,
                    &tombstones,
                    query,
                    &[ep],
                    self.ef_construction,
                    layer,
                    1.0,
                    &self.prefetcher,
                );
                let bound = self.layer_bound(layer);
                let selected = self.select_diverse(&vectors, &candidates, bound);
                self.graph.set_neighbors(layer, node, selected.clone());
                for &neighbor in &selected {
                    self.link_back(&vectors, neighbor, node, layer, bound);
                }
                if let Some(&(_, nearest)) = candidates.first() {
                    ep = nearest;
                }
            }
        }

        if top > self.graph.max_layer() {
            self.graph.set_entry(node, top);
        }
        top
    }

    /// Tombstones `node` and, when the reverse-edge index is on, eagerly
    /// strips it out of every adjacency list that points at it. Each source
    /// is offered the removed node's own neighbors as replacement
    /// candidates, re-diversified at the layer bound, so survivors that
    /// were only connected through `node` stay reachable.
    pub(crate) fn remove(&self, node: NodeId) {
        self.graph.tombstone(node);
        if !self.graph.has_reverse() {
            return;
        }
        let vectors = self.store.read();
        let tombstones = self.graph.tombstones();
        for layer in 0..self.graph.num_layers() {
            let bound = self.layer_bound(layer);
            let outgoing: Vec<NodeId> = self
                .graph
                .neighbors(layer, node)
                .into_iter()
                .filter(|&n| n != node && !tombstones.contains(n as u32))
                .collect();
            for src in self.graph.incoming(layer, node) {
                if src == node {
                    continue;
                }
                let src_vec = vectors.get(src);
                self.graph.update_neighbors(layer, src, |list| {
                    list.retain(|&n| n != node);
                    let mut cands: Vec<(f32, NodeId)> = list
                        .iter()
                        .map(|&n| (self.metric.distance(src_vec, vectors.get(n)), n))
                        .collect();
                    for &n in &outgoing {
                        if n == src || list.contains(&n) {
                            continue;
                        }
                        cands.push((self.metric.distance(src_vec, vectors.get(n)), n));
                    }
                    cands.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                    *list = self.select_diverse(&vectors, &cands, bound);
                });
            }
            self.graph.set_neighbors(layer, node, Vec::new());
        }
    }

    /// Max neighbors at `layer`; layer 0 is twice as wide.
    pub(crate) fn layer_bound(&self, layer: usize) -> usize {
        if layer == 0 {
            2 * self.max_degree
        } else {
            self.max_degree
        }
    }

    /// Diversified neighbor selection over candidates sorted ascending by
    /// distance: a candidate is kept only if it is closer to the query node
    /// than to every already-kept neighbor, which spreads edges across
    /// directions instead of clustering them.
    fn select_diverse(
        &self,
        vectors: &VectorGuard<'_>,
        candidates: &[(f32, NodeId)],
        max: usize,
    ) -> Vec<NodeId> {
        let mut selected: Vec<(f32, NodeId)> = Vec::with_capacity(max.min(candidates.len()));
        for &(dist, cand) in candidates {
            if selected.len() >= max {
                break;
            }
            let cand_vec = vectors.get(cand);
            let diverse = selected
                .iter()
                .all(|&(_, kept)| self.metric.distance(cand_vec, vectors.get(kept)) > dist);
            if diverse {
                selected.push((dist, cand));
            }
        }
        selected.into_iter().map(|(_, n)| n).collect()
    }

    /// Adds the back edge `neighbor -> node`, re-running diversification on
    /// the enlarged list when it exceeds the layer bound.
    fn link_back(
        &self,
        vectors: &VectorGuard<'_>,
        neighbor: NodeId,
        node: NodeId,
        layer: usize,
        bound: usize,
    ) {
        let d_new = self
            .metric
            .distance(vectors.get(neighbor), vectors.get(node));
        self.graph.update_neighbors(layer, neighbor, |list| {
            if list.contains(&node) {
                return;
            }
            if list.len() < bound {
                list.push(node);
                return;
            }
            let base = vectors.get(neighbor);
            let mut cands: Vec<(f32, NodeId)> = list
                .iter()
                .map(|&n| (self.metric.distance(base, vectors.get(n)), n))
                .collect();
            cands.push((d_new, node));
            cands.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            *list = self.select_diverse(vectors, &cands, bound);
        });
    }

    /// Draws a top layer from the geometric distribution
    /// `floor(-ln(u) / ln(max_degree))`.
    pub(crate) fn random_layer(&self) -> usize {
        let x = self.next_u64();
        // Map to the open interval (0, 1) so ln never sees 0.
        let unit = (x as f64 + 1.0) / (u64::MAX as f64 + 2.0);
        let inv_ln = 1.0 / (self.max_degree as f64).ln();
        let level = (-unit.ln() * inv_ln).floor() as usize;
        level.min(MAX_LAYERS - 1)
    }

    /// xorshift64 step over the shared rng state.
    fn next_u64(&self) -> u64 {
        let step = |mut x: u64| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        };
        let prev = match self
            .rng
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| Some(step(x)))
        {
            Ok(p) | Err(p) => p,
        };
        step(prev)
    }
}
