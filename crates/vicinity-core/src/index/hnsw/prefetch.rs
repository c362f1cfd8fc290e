//! Cache-prefetch hints for the search inner loop.
//!
//! During frontier expansion the engine touches two memory regions per
//! candidate: the candidate's vector codes and the visited-bitmap byte used
//! to gate re-expansion. Both accesses follow neighbor-list order, so the
//! upcoming addresses are known a few iterations ahead and can be prefetched
//! to hide memory latency. Prefetching is purely a performance hint: it
//! never changes which candidates are visited or the final result, and it
//! degrades to a no-op on platforms without prefetch instructions.

use serde::{Deserialize, Serialize};

use super::layer::NodeId;
use super::vector_store::VectorGuard;
use super::visited::VisitedSet;

/// Cache line size assumed for prefetch depth calculations.
pub(crate) const CACHE_LINE: usize = 64;

/// Prefetch strategy for graph traversal.
///
/// A tagged union, matched exhaustively at the point of use: modes that
/// carry no tuning payload do not drag dead fields around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchMode {
    /// No prefetch hints. The correctness baseline.
    Disabled,
    /// Stride derived from the vector byte size at build time:
    /// `max(1, vector_bytes / 128 - 1)`, depth 1.
    #[default]
    Hardcoded,
    /// Caller-tuned stride and depth.
    Custom {
        /// Neighbor-list positions to look ahead for vector codes.
        stride_codes: u32,
        /// Cache lines to prefetch per vector-code hint.
        depth_codes: u32,
        /// Neighbor-list positions to look ahead for visited metadata.
        stride_visit: u32,
    },
}

/// Default visited-bitmap lookahead for `Hardcoded` mode.
const HARDCODED_STRIDE_VISIT: usize = 3;

/// Resolved prefetch parameters for one traversal.
///
/// Built once per search from the build-time mode, the query-time override
/// and the vector byte layout, then consulted per neighbor in the expansion
/// loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Prefetcher {
    active: bool,
    stride_codes: usize,
    depth_codes: usize,
    stride_visit: usize,
}

impl Prefetcher {
    /// A prefetcher that issues no hints.
    pub(crate) const fn disabled() -> Self {
        Self {
            active: false,
            stride_codes: 0,
            depth_codes: 0,
            stride_visit: 0,
        }
    }

    /// Resolves the effective parameters for one traversal.
    ///
    /// `Disabled` switches hints off. `Hardcoded` uses the stride computed
    /// from the build-time vector byte size (`hardcoded_stride`), depth 1.
    /// Which mode is effective for a query is decided by the index facade,
    /// where the build-time mode governs over the query-time default.
    pub(crate) fn resolve(mode: PrefetchMode, hardcoded_stride: usize) -> Self {
        match mode {
            PrefetchMode::Disabled => Self::disabled(),
            PrefetchMode::Hardcoded => Self {
                active: true,
                stride_codes: hardcoded_stride,
                depth_codes: 1,
                stride_visit: HARDCODED_STRIDE_VISIT,
            },
            PrefetchMode::Custom {
                stride_codes,
                depth_codes,
                stride_visit,
            } => Self {
                active: true,
                stride_codes: stride_codes.max(1) as usize,
                depth_codes: depth_codes.max(1) as usize,
                stride_visit: stride_visit.max(1) as usize,
            },
        }
    }

    /// Computes the `Hardcoded` stride for a given per-vector byte size.
    pub(crate) fn hardcoded_stride(vector_bytes: usize) -> usize {
        (vector_bytes / (2 * CACHE_LINE)).saturating_sub(1).max(1)
    }

    /// Hints the vector codes of the neighbor `stride_codes` positions ahead
    /// of position `i`, `depth_codes` cache lines deep.
    #[inline]
    pub(crate) fn hint_codes(&self, vectors: &VectorGuard<'_>, neighbors: &[NodeId], i: usize) {
        if !self.active {
            return;
        }
        let ahead = i + self.stride_codes;
        if ahead < neighbors.len() {
            vectors.prefetch(neighbors[ahead], self.depth_codes);
        }
    }

    /// Hints the visited-bitmap byte of the neighbor `stride_visit`
    /// positions ahead of position `i`.
    #[inline]
    pub(crate) fn hint_visited(&self, visited: &VisitedSet, neighbors: &[NodeId], i: usize) {
        if !self.active {
            return;
        }
        let ahead = i + self.stride_visit;
        if ahead < neighbors.len() {
            if let Some(ptr) = visited.byte_ptr(neighbors[ahead]) {
                prefetch_read(ptr);
            }
        }
    }

    #[cfg(test)]
    pub(crate) const fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub(crate) const fn strides(&self) -> (usize, usize, usize) {
        (self.stride_codes, self.depth_codes, self.stride_visit)
    }
}

/// Issues a read prefetch hint for the cache line containing `ptr`.
///
/// Hints cannot fault, so any address is acceptable; platforms without a
/// prefetch instruction compile this to nothing.
#[inline(always)]
pub(crate) fn prefetch_read(ptr: *const u8) {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: prefetch is a hint and does not fault on invalid addresses.
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch(ptr.cast::<i8>(), _MM_HINT_T0);
    }

    // The stdarch aarch64 prefetch intrinsic is unstable (rust#117217);
    // issue the instruction directly.
    #[cfg(target_arch = "aarch64")]
    // SAFETY: prefetch is a hint and does not fault on invalid addresses.
    unsafe {
        core::arch::asm!(
            "prfm pldl1keep, [{ptr}]",
            ptr = in(reg) ptr,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    let _ = ptr;
}
