//! # Vicinity Core
//!
//! Low-latency approximate nearest-neighbor search over a layered proximity
//! graph (the HNSW family).
//!
//! ## Features
//!
//! - **Layered proximity graph**: logarithmic greedy descent + bounded
//!   best-first search at the base layer
//! - **Cache prefetching**: configurable prefetch hints in the search inner
//!   loop (`Disabled` / `Hardcoded` / `Custom`)
//! - **Lazy deletion**: tombstones with optional eager reverse-edge unlinking
//! - **Conjugate graph**: query-feedback shortcut edges patching
//!   under-connectivity
//! - **Atomic snapshots**: all-or-nothing save/load via bincode
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vicinity_core::{Dataset, DistanceMetric, HnswIndex, HnswParams, SearchParams};
//!
//! let params = HnswParams::new(DistanceMetric::Euclidean, 128, 16, 200);
//! let index = HnswIndex::new(params)?;
//!
//! let dataset = Dataset::dense(ids, 128, vectors)?;
//! index.build(&dataset)?;
//!
//! let results = index.knn_search(&query, 10, &SearchParams::new(100))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Numeric casts are pervasive in index/offset arithmetic; internal indices
// stay well below u32::MAX by construction.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod dataset;
#[cfg(test)]
mod dataset_tests;
pub mod distance;
pub mod error;
pub mod index;

pub use dataset::Dataset;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::hnsw::{DataType, HnswIndex, HnswParams, PrefetchMode, SearchParams};
