//! Layered proximity-graph storage.
//!
//! `ProximityGraph` owns the per-layer adjacency arenas, the entry point,
//! the tombstone set and the optional reverse-edge index. It is a pure data
//! structure: all traversal and linking policy lives in `builder` and
//! `search`.
//!
//! Lock order is `layers` -> per-node lock -> `reverse`; no lock is held
//! across a distance computation. Tombstones are lazy: a removed node keeps
//! its arena slot and adjacency, it just stops qualifying for result sets.

use parking_lot::{RwLock, RwLockReadGuard};
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::layer::{Layer, NodeId};

/// Per-layer map from node to the nodes pointing at it.
type ReverseLayer = FxHashMap<NodeId, Vec<NodeId>>;

/// Layered adjacency with lazy tombstones.
pub(crate) struct ProximityGraph {
    /// Layer 0 first; every layer's arena covers all allocated nodes.
    layers: RwLock<Vec<Layer>>,
    /// Internal index of the current highest-layer node.
    entry_point: RwLock<Option<NodeId>>,
    /// Top layer of the entry point.
    max_layer: AtomicUsize,
    /// Internal indices of removed nodes.
    tombstones: RwLock<RoaringBitmap>,
    /// Incoming-edge index per layer, maintained only when
    /// `use_reversed_edges` is set. Accelerates eager unlinking on remove.
    reverse: Option<RwLock<Vec<ReverseLayer>>>,
}

impl ProximityGraph {
    pub(crate) fn new(use_reversed_edges: bool) -> Self {
        Self {
            layers: RwLock::new(vec![Layer::new(0)]),
            entry_point: RwLock::new(None),
            max_layer: AtomicUsize::new(0),
            tombstones: RwLock::new(RoaringBitmap::new()),
            reverse: use_reversed_edges.then(|| RwLock::new(vec![ReverseLayer::default()])),
        }
    }

    /// Rebuilds a graph from snapshot parts. The reverse index, when
    /// enabled, is reconstructed from the adjacency rather than persisted.
    pub(crate) fn from_parts(
        adjacency: Vec<Vec<Vec<NodeId>>>,
        entry_point: Option<NodeId>,
        max_layer: usize,
        tombstones: RoaringBitmap,
        use_reversed_edges: bool,
    ) -> Self {
        let reverse = use_reversed_edges.then(|| {
            let mut rev: Vec<ReverseLayer> = Vec::with_capacity(adjacency.len());
            for lists in &adjacency {
                let mut layer_rev = ReverseLayer::default();
                for (src, neighbors) in lists.iter().enumerate() {
                    for &dst in neighbors {
                        layer_rev.entry(dst).or_insert_with(Vec::new).push(src);
                    }
                }
                rev.push(layer_rev);
            }
            RwLock::new(rev)
        });
        Self {
            layers: RwLock::new(adjacency.into_iter().map(Layer::from_lists).collect()),
            entry_point: RwLock::new(entry_point),
            max_layer: AtomicUsize::new(max_layer),
            tombstones: RwLock::new(tombstones),
            reverse,
        }
    }

    /// Extends all arenas to cover `node` and creates layers up to
    /// `top_layer`.
    pub(crate) fn ensure_node(&self, node: NodeId, top_layer: usize) {
        let mut layers = self.layers.write();
        while layers.len() <= top_layer {
            layers.push(Layer::new(node + 1));
        }
        for layer in layers.iter_mut() {
            layer.ensure_capacity(node);
        }
        drop(layers);
        if let Some(reverse) = &self.reverse {
            let mut rev = reverse.write();
            while rev.len() <= top_layer {
                rev.push(ReverseLayer::default());
            }
        }
    }

    /// Total arena slots (allocated nodes, tombstoned included).
    pub(crate) fn node_capacity(&self) -> usize {
        self.layers.read().first().map_or(0, Layer::len)
    }

    /// Neighbor list of `node` at `layer_idx`.
    pub(crate) fn neighbors(&self, layer_idx: usize, node: NodeId) -> Vec<NodeId> {
        let layers = self.layers.read();
        layers.get(layer_idx).map_or_else(Vec::new, |l| l.get(node))
    }

    /// Replaces the neighbor list of `node` at `layer_idx`, keeping the
    /// reverse index consistent when enabled.
    pub(crate) fn set_neighbors(&self, layer_idx: usize, node: NodeId, list: Vec<NodeId>) {
        self.update_neighbors(layer_idx, node, |l| *l = list);
    }

    /// Read-modify-write of one neighbor list. The closure runs under the
    /// node's write lock; the reverse index is diffed afterwards, so a
    /// concurrent `incoming` read may briefly lag the adjacency.
    pub(crate) fn update_neighbors<F>(&self, layer_idx: usize, node: NodeId, f: F)
    where
        F: FnOnce(&mut Vec<NodeId>),
    {
        let diff = {
            let layers = self.layers.read();
            layers.get(layer_idx).and_then(|layer| layer.update(node, f))
        };
        let (Some((old, new)), Some(reverse)) = (diff, &self.reverse) else {
            return;
        };
        let mut rev = reverse.write();
        let Some(layer_rev) = rev.get_mut(layer_idx) else {
            return;
        };
        for dst in &old {
            if !new.contains(dst) {
                if let Some(sources) = layer_rev.get_mut(dst) {
                    sources.retain(|&s| s != node);
                }
            }
        }
        for dst in &new {
            if !old.contains(dst) {
                let sources = layer_rev.entry(*dst).or_insert_with(Vec::new);
                if !sources.contains(&node) {
                    sources.push(node);
                }
            }
        }
    }

    /// Nodes with an edge pointing at `node` on `layer_idx`. Empty when the
    /// reverse index is disabled.
    pub(crate) fn incoming(&self, layer_idx: usize, node: NodeId) -> Vec<NodeId> {
        self.reverse.as_ref().map_or_else(Vec::new, |reverse| {
            reverse
                .read()
                .get(layer_idx)
                .and_then(|layer_rev| layer_rev.get(&node).cloned())
                .unwrap_or_default()
        })
    }

    pub(crate) fn has_reverse(&self) -> bool {
        self.reverse.is_some()
    }

    pub(crate) fn entry_point(&self) -> Option<NodeId> {
        *self.entry_point.read()
    }

    /// Installs `node` as the entry point with top layer `layer`.
    pub(crate) fn set_entry(&self, node: NodeId, layer: usize) {
        let mut entry = self.entry_point.write();
        *entry = Some(node);
        self.max_layer.store(layer, Ordering::Release);
    }

    /// Installs `node` as the entry point only if the graph has none yet.
    /// Returns whether this call won the race.
    pub(crate) fn try_init_entry(&self, node: NodeId, layer: usize) -> bool {
        let mut entry = self.entry_point.write();
        if entry.is_some() {
            return false;
        }
        *entry = Some(node);
        self.max_layer.store(layer, Ordering::Release);
        true
    }

    /// Drops the entry point; used when the last live node is removed.
    pub(crate) fn clear_entry(&self) {
        let mut entry = self.entry_point.write();
        *entry = None;
        self.max_layer.store(0, Ordering::Release);
    }

    pub(crate) fn max_layer(&self) -> usize {
        self.max_layer.load(Ordering::Acquire)
    }

    pub(crate) fn num_layers(&self) -> usize {
        self.layers.read().len()
    }

    /// Marks `node` removed. Adjacency stays in place.
    pub(crate) fn tombstone(&self, node: NodeId) {
        self.tombstones.write().insert(node as u32);
    }

    pub(crate) fn is_tombstoned(&self, node: NodeId) -> bool {
        self.tombstones.read().contains(node as u32)
    }

    /// Read guard over the tombstone set, held for a whole traversal.
    pub(crate) fn tombstones(&self) -> RwLockReadGuard<'_, RoaringBitmap> {
        self.tombstones.read()
    }

    /// Snapshot of the tombstone set, for serialization.
    pub(crate) fn tombstones_snapshot(&self) -> RoaringBitmap {
        self.tombstones.read().clone()
    }

    /// Snapshot of all adjacency lists, layer-major, for serialization.
    pub(crate) fn adjacency_snapshot(&self) -> Vec<Vec<Vec<NodeId>>> {
        self.layers.read().iter().map(Layer::to_lists).collect()
    }
}
