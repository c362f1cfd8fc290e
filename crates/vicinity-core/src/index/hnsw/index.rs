//! The HNSW index facade.
//!
//! `HnswIndex` wires the graph, the vector arena, the id mappings and the
//! optional conjugate graph together behind the public build/search/remove
//! surface. All validation happens here; the builder and engine below it
//! assume well-formed input.
//!
//! Concurrency: `build`/`add` may run from multiple threads over disjoint
//! ids, serialized only by the per-node adjacency locks. Searches are
//! read-only and run concurrently with each other; with `use_static` the
//! index freezes after `build` and rejects further mutation.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::builder::GraphBuilder;
use super::conjugate::ConjugateGraph;
use super::graph::ProximityGraph;
use super::layer::NodeId;
use super::mappings::IdMappings;
use super::params::{HnswParams, SearchParams};
use super::persistence::{Snapshot, SNAPSHOT_VERSION};
use super::prefetch::{PrefetchMode, Prefetcher};
use super::search::SearchEngine;
use super::vector_store::VectorStore;
use crate::dataset::Dataset;
use crate::distance::normalize;
use crate::error::{Error, Result};

/// Fixed seed for the layer-assignment rng: graph shape is reproducible
/// for a given insertion order.
const RNG_SEED: u64 = 0x5DEE_CE66_D1A4_B5B5;

/// An HNSW approximate nearest-neighbor index over f32 vectors.
pub struct HnswIndex {
    params: HnswParams,
    graph: ProximityGraph,
    store: VectorStore,
    mappings: RwLock<IdMappings>,
    conjugate: Option<ConjugateGraph>,
    rng_state: AtomicU64,
    /// Prefetch stride for `Hardcoded` mode, derived from the vector byte
    /// size once at construction.
    hardcoded_stride: usize,
    frozen: AtomicBool,
}

impl HnswIndex {
    /// Creates an empty index from validated build parameters.
    pub fn new(params: HnswParams) -> Result<Self> {
        params.validate()?;
        let store = VectorStore::new(params.dim);
        let hardcoded_stride = Prefetcher::hardcoded_stride(store.vector_bytes());
        Ok(Self {
            graph: ProximityGraph::new(params.use_reversed_edges),
            store,
            mappings: RwLock::new(IdMappings::new()),
            conjugate: params.use_conjugate_graph.then(ConjugateGraph::new),
            rng_state: AtomicU64::new(RNG_SEED),
            hardcoded_stride,
            frozen: AtomicBool::new(false),
            params,
        })
    }

    /// Builds the graph from a whole dataset, inserting rows in parallel.
    ///
    /// All ids are checked before anything is committed, so a duplicate id
    /// fails the call without touching the index. With `use_static`, the
    /// index freezes once the build completes.
    pub fn build(&self, dataset: &Dataset) -> Result<()> {
        self.check_mutable()?;
        self.check_dim(dataset.dim())?;

        let slots: Vec<usize> = {
            let mut mappings = self.mappings.write();
            let mut batch: FxHashSet<u64> = FxHashSet::default();
            for &id in dataset.ids() {
                if mappings.get_idx(id).is_some() || !batch.insert(id) {
                    return Err(Error::DuplicateId(id));
                }
            }
            dataset
                .ids()
                .iter()
                .filter_map(|&id| mappings.register(id))
                .collect()
        };

        for (row, &idx) in slots.iter().enumerate() {
            let mut vector = dataset.row(row).into_owned();
            if self.params.normalize {
                normalize(&mut vector);
            }
            self.store.insert_at(idx, &vector);
        }

        let builder = self.builder();
        slots.par_iter().for_each(|&idx| {
            builder.insert(idx);
        });

        if self.params.use_static {
            self.frozen.store(true, Ordering::Release);
        }
        info!(
            rows = dataset.len(),
            layers = self.graph.num_layers(),
            frozen = self.params.use_static,
            "index built"
        );
        Ok(())
    }

    /// Inserts a batch of vectors with partial-success semantics: rows with
    /// an already-live id are skipped and their ids returned; every other
    /// row is committed.
    pub fn add(&self, dataset: &Dataset) -> Result<Vec<u64>> {
        self.check_mutable()?;
        self.check_dim(dataset.dim())?;

        let builder = self.builder();
        let mut failed = Vec::new();
        for (row, &id) in dataset.ids().iter().enumerate() {
            let idx = {
                let mut mappings = self.mappings.write();
                mappings.register(id)
            };
            let Some(idx) = idx else {
                failed.push(id);
                continue;
            };
            let mut vector = dataset.row(row).into_owned();
            if self.params.normalize {
                normalize(&mut vector);
            }
            self.store.insert_at(idx, &vector);
            builder.insert(idx);
        }
        debug!(
            rows = dataset.len(),
            rejected = failed.len(),
            "batch add done"
        );
        Ok(failed)
    }

    /// Removes `id`. The node is tombstoned in place; with
    /// `use_reversed_edges` its incoming edges are also unlinked eagerly
    /// and the affected sources relinked to its former neighbors.
    pub fn remove(&self, id: u64) -> Result<()> {
        self.check_mutable()?;
        let idx = {
            let mut mappings = self.mappings.write();
            mappings.remove(id).ok_or(Error::NotFound(id))?
        };
        self.builder().remove(idx);
        if let Some(conjugate) = &self.conjugate {
            conjugate.forget(id);
        }
        if self.graph.entry_point() == Some(idx) {
            self.reseat_entry();
        }
        debug!(id, "removed");
        Ok(())
    }

    /// Returns the `k` approximate nearest neighbors of `query` as
    /// `(id, distance)` pairs sorted ascending by distance, ties broken by
    /// insertion order. Fewer than `k` live vectors yield a shorter result.
    pub fn knn_search(
        &self,
        query: &[f32],
        k: usize,
        search: &SearchParams,
    ) -> Result<Vec<(u64, f32)>> {
        search.validate(k)?;
        self.check_dim(query.len())?;
        let query = self.prepare_query(query);
        let prefetcher = self.resolve_prefetcher(search.prefetch_mode);

        let vectors = self.store.read();
        let tombstones = self.graph.tombstones();
        let raw = self.engine().knn(
            &vectors,
            &tombstones,
            &query,
            search.ef_search,
            search.skip_ratio,
            &prefetcher,
        );

        let mappings = self.mappings.read();
        let mut results: Vec<(f32, NodeId, u64)> = raw
            .into_iter()
            .filter_map(|(d, idx)| mappings.get_id(idx).map(|id| (d, idx, id)))
            .collect();
        match &self.conjugate {
            Some(conjugate) if search.use_conjugate_graph_search => {
                let metric = self.params.metric;
                conjugate.enhance(&mut results, k, |id| {
                    mappings
                        .get_idx(id)
                        .map(|idx| (metric.distance(&query, vectors.get(idx)), idx))
                });
            }
            _ => results.truncate(k),
        }
        Ok(results.into_iter().map(|(d, _, id)| (id, d)).collect())
    }

    /// Returns every live vector within `threshold` of `query`, sorted
    /// ascending by distance. `ef_search` acts as an exploration floor.
    pub fn range_search(
        &self,
        query: &[f32],
        threshold: f32,
        search: &SearchParams,
    ) -> Result<Vec<(u64, f32)>> {
        search.validate(0)?;
        self.check_dim(query.len())?;
        let query = self.prepare_query(query);
        let prefetcher = self.resolve_prefetcher(search.prefetch_mode);

        let vectors = self.store.read();
        let tombstones = self.graph.tombstones();
        let raw = self.engine().range(
            &vectors,
            &tombstones,
            &query,
            threshold,
            search.ef_search,
            &prefetcher,
        );

        let mappings = self.mappings.read();
        Ok(raw
            .into_iter()
            .filter_map(|(d, idx)| mappings.get_id(idx).map(|id| (id, d)))
            .collect())
    }

    /// Runs one k-NN search per dataset row, in parallel. Queries share
    /// only read-only state.
    pub fn knn_search_batch(
        &self,
        queries: &Dataset,
        k: usize,
        search: &SearchParams,
    ) -> Result<Vec<Vec<(u64, f32)>>> {
        self.check_dim(queries.dim())?;
        (0..queries.len())
            .into_par_iter()
            .map(|row| self.knn_search(&queries.row(row), k, search))
            .collect()
    }

    /// Feeds ground truth back into the conjugate graph: every live
    /// `expected` id missing from the current top-`k` gets a shortcut edge
    /// from the query's nearest returned node. Returns the number of edges
    /// added.
    pub fn feedback(&self, query: &[f32], k: usize, expected: &[u64]) -> Result<usize> {
        let Some(conjugate) = &self.conjugate else {
            return Err(Error::Config(
                "feedback requires use_conjugate_graph".into(),
            ));
        };
        let search = SearchParams::new(k.max(SearchParams::default().ef_search));
        let results = self.knn_search(query, k, &search)?;
        let Some(&(anchor, _)) = results.first() else {
            return Ok(0);
        };

        let mappings = self.mappings.read();
        let mut added = 0;
        for &id in expected {
            if mappings.get_idx(id).is_none() {
                continue;
            }
            if results.iter().any(|&(r, _)| r == id) {
                continue;
            }
            if conjugate.add_neighbor(anchor, id) {
                added += 1;
            }
        }
        if added > 0 {
            debug!(added, anchor, "conjugate feedback recorded");
        }
        Ok(added)
    }

    /// Writes an atomic snapshot to `path`: a failed save leaves any
    /// previous file untouched.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        snapshot.write_path(path)?;
        info!(path = %path.display(), nodes = self.len(), "snapshot saved");
        Ok(())
    }

    /// Serializes a snapshot into `writer`.
    pub fn save_to<W: Write>(&self, writer: W) -> Result<()> {
        self.snapshot().write_to(writer)
    }

    /// Loads an index from a snapshot file. A truncated or corrupt file
    /// fails cleanly without constructing partial state.
    pub fn load(path: &Path) -> Result<Self> {
        let index = Self::from_snapshot(Snapshot::read_path(path)?)?;
        info!(path = %path.display(), nodes = index.len(), "snapshot loaded");
        Ok(index)
    }

    /// Deserializes an index from `reader`.
    pub fn load_from<R: Read>(reader: R) -> Result<Self> {
        Self::from_snapshot(Snapshot::read_from(reader)?)
    }

    /// Number of live vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    /// Returns true if no live vectors remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.params.dim
    }

    /// Build parameters this index was created with.
    #[must_use]
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.mappings.read().get_idx(id).is_some()
    }

    /// Number of tombstoned nodes still occupying arena slots.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.graph.tombstones().len() as usize
    }

    fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder {
            graph: &self.graph,
            store: &self.store,
            metric: self.params.metric,
            max_degree: self.params.max_degree,
            ef_construction: self.params.ef_construction,
            rng: &self.rng_state,
            prefetcher: Prefetcher::resolve(self.params.prefetch_mode, self.hardcoded_stride),
        }
    }

    fn engine(&self) -> SearchEngine<'_> {
        SearchEngine {
            graph: &self.graph,
            metric: self.params.metric,
        }
    }

    /// Effective prefetcher for one query. The build-time mode governs:
    /// the query-time `Hardcoded` default defers to it, so an index built
    /// with prefetching disabled stays that way unless the query
    /// explicitly asks for `Custom` tuning or flips the mode itself.
    pub(crate) fn resolve_prefetcher(&self, query_mode: PrefetchMode) -> Prefetcher {
        let mode = match query_mode {
            PrefetchMode::Hardcoded => self.params.prefetch_mode,
            other => other,
        };
        Prefetcher::resolve(mode, self.hardcoded_stride)
    }

    fn check_mutable(&self) -> Result<()> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(Error::Config(
                "index is frozen (use_static), no further mutation accepted".into(),
            ));
        }
        Ok(())
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        if dim != self.params.dim {
            return Err(Error::DimensionMismatch {
                expected: self.params.dim,
                actual: dim,
            });
        }
        Ok(())
    }

    fn prepare_query(&self, query: &[f32]) -> Vec<f32> {
        let mut q = query.to_vec();
        if self.params.normalize {
            normalize(&mut q);
        }
        q
    }

    /// Moves the entry point off a removed node, onto the live node with
    /// the smallest internal index (at its highest populated layer), or
    /// clears it when no live node remains.
    fn reseat_entry(&self) {
        let replacement = self.mappings.read().min_live_idx();
        match replacement {
            Some(idx) => {
                let top = (0..self.graph.num_layers())
                    .rev()
                    .find(|&layer| !self.graph.neighbors(layer, idx).is_empty())
                    .unwrap_or(0);
                self.graph.set_entry(idx, top);
            }
            None => self.graph.clear_entry(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            params: self.params.clone(),
            entry_point: self.graph.entry_point(),
            max_layer: self.graph.max_layer(),
            adjacency: self.graph.adjacency_snapshot(),
            mappings: self.mappings.read().clone(),
            tombstones: self.graph.tombstones_snapshot(),
            vectors: self.store.raw(),
            conjugate: self.conjugate.as_ref().map(ConjugateGraph::snapshot),
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        snapshot.params.validate()?;
        let params = snapshot.params;
        let store = VectorStore::with_data(params.dim, snapshot.vectors);
        let hardcoded_stride = Prefetcher::hardcoded_stride(store.vector_bytes());
        let conjugate = match snapshot.conjugate {
            Some(edges) => Some(ConjugateGraph::from_snapshot(edges)),
            None => params.use_conjugate_graph.then(ConjugateGraph::new),
        };
        Ok(Self {
            graph: ProximityGraph::from_parts(
                snapshot.adjacency,
                snapshot.entry_point,
                snapshot.max_layer,
                snapshot.tombstones,
                params.use_reversed_edges,
            ),
            store,
            mappings: RwLock::new(snapshot.mappings),
            conjugate,
            rng_state: AtomicU64::new(RNG_SEED),
            hardcoded_stride,
            frozen: AtomicBool::new(params.use_static),
            params,
        })
    }
}

impl fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HnswIndex")
            .field("params", &self.params)
            .field("live", &self.len())
            .field("tombstones", &self.tombstone_count())
            .field("layers", &self.graph.num_layers())
            .field("frozen", &self.frozen.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}
