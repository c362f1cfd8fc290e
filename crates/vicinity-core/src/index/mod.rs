//! Index implementations.

pub mod hnsw;
