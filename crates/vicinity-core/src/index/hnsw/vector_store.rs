//! Contiguous vector arena.
//!
//! All vectors live in one `Vec<f32>`, `dim` consecutive floats per internal
//! index. Contiguous layout keeps distance kernels cache-friendly and makes
//! per-vector prefetch addresses trivially computable. Slots are addressed
//! by internal node index and never compacted; tombstoned slots simply stop
//! being read.
//!
//! Search code takes a [`VectorGuard`] once per traversal, holding the read
//! lock across the whole search instead of re-acquiring it per candidate.

use parking_lot::{RwLock, RwLockReadGuard};

use super::layer::NodeId;
use super::prefetch::{prefetch_read, CACHE_LINE};

/// Contiguous f32 vector storage with O(1) slot access.
pub(crate) struct VectorStore {
    buffer: RwLock<Vec<f32>>,
    dim: usize,
}

impl VectorStore {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            buffer: RwLock::new(Vec::new()),
            dim,
        }
    }

    pub(crate) fn with_data(dim: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len() % dim, 0);
        Self {
            buffer: RwLock::new(data),
            dim,
        }
    }

    /// Vector dimensionality.
    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    /// Bytes occupied by one vector, the unit the prefetch stride is
    /// derived from.
    pub(crate) fn vector_bytes(&self) -> usize {
        self.dim * std::mem::size_of::<f32>()
    }

    /// Number of allocated slots.
    pub(crate) fn slots(&self) -> usize {
        self.buffer.read().len() / self.dim
    }

    /// Writes `vector` into slot `idx`, growing the arena if needed.
    pub(crate) fn insert_at(&self, idx: NodeId, vector: &[f32]) {
        debug_assert_eq!(vector.len(), self.dim);
        let mut buffer = self.buffer.write();
        let end = (idx + 1) * self.dim;
        if buffer.len() < end {
            buffer.resize(end, 0.0);
        }
        buffer[idx * self.dim..end].copy_from_slice(vector);
    }

    /// Snapshot of the raw buffer, for serialization.
    pub(crate) fn raw(&self) -> Vec<f32> {
        self.buffer.read().clone()
    }

    /// Acquires the read lock for the duration of one traversal.
    pub(crate) fn read(&self) -> VectorGuard<'_> {
        VectorGuard {
            guard: self.buffer.read(),
            dim: self.dim,
        }
    }
}

/// Read access to the arena, held across a whole search.
pub(crate) struct VectorGuard<'a> {
    guard: RwLockReadGuard<'a, Vec<f32>>,
    dim: usize,
}

impl VectorGuard<'_> {
    /// The vector stored in slot `idx`.
    #[inline]
    pub(crate) fn get(&self, idx: NodeId) -> &[f32] {
        &self.guard[idx * self.dim..(idx + 1) * self.dim]
    }

    /// Issues `depth` cache-line prefetch hints for slot `idx`.
    #[inline]
    pub(crate) fn prefetch(&self, idx: NodeId, depth: usize) {
        let offset = idx * self.dim;
        if offset + self.dim > self.guard.len() {
            return;
        }
        let base = self.guard[offset..].as_ptr().cast::<u8>();
        let bytes = self.dim * std::mem::size_of::<f32>();
        for line in 0..depth {
            let byte_offset = line * CACHE_LINE;
            if byte_offset >= bytes {
                break;
            }
            // SAFETY: byte_offset stays within the slot checked above.
            prefetch_read(unsafe { base.add(byte_offset) });
        }
    }
}
