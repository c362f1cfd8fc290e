//! HNSW (Hierarchical Navigable Small World) index.
//!
//! Approximate nearest-neighbor search over a multi-layer proximity graph,
//! following Malkov & Yashunin (2016).
//!
//! # Module Organization
//!
//! - `params`: build and search parameter value types
//! - `graph`: layered adjacency with per-node locks and lazy tombstones
//! - `builder`: insertion, linking and edge diversification
//! - `search`: greedy descent and bounded best-first traversal
//! - `prefetch`: cache-prefetch hints for the search inner loop
//! - `conjugate`: query-feedback shortcut edges
//! - `persistence`: atomic binary snapshots
//! - `index`: the public `HnswIndex` facade

mod builder;
mod conjugate;
mod graph;
mod index;
mod layer;
mod mappings;
mod ordered_float;
mod params;
mod persistence;
mod prefetch;
mod search;
mod vector_store;
mod visited;

#[cfg(test)]
mod conjugate_tests;
#[cfg(test)]
mod persistence_tests;
#[cfg(test)]
mod prefetch_tests;
#[cfg(test)]
mod vector_store_tests;

pub use index::HnswIndex;
pub use params::{DataType, HnswParams, SearchParams};
pub use prefetch::PrefetchMode;
