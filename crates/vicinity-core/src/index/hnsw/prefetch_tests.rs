//! Tests for the `prefetch` module.

use super::prefetch::{prefetch_read, PrefetchMode, Prefetcher};
use super::vector_store::VectorStore;
use super::visited::VisitedSet;

#[test]
fn test_hardcoded_stride_formula() {
    // stride = max(1, vector_bytes / 128 - 1)
    assert_eq!(Prefetcher::hardcoded_stride(64), 1); // 16-dim f32
    assert_eq!(Prefetcher::hardcoded_stride(128), 1);
    assert_eq!(Prefetcher::hardcoded_stride(512), 3); // 128-dim f32
    assert_eq!(Prefetcher::hardcoded_stride(3072), 23); // 768-dim f32
}

#[test]
fn test_resolve_disabled_is_inactive() {
    let p = Prefetcher::resolve(PrefetchMode::Disabled, 7);
    assert!(!p.is_active());
}

#[test]
fn test_resolve_hardcoded_uses_build_time_stride() {
    let p = Prefetcher::resolve(PrefetchMode::Hardcoded, 7);
    assert!(p.is_active());
    assert_eq!(p.strides(), (7, 1, 3));
}

#[test]
fn test_resolve_custom_wins() {
    let p = Prefetcher::resolve(
        PrefetchMode::Custom {
            stride_codes: 4,
            depth_codes: 2,
            stride_visit: 5,
        },
        7,
    );
    assert_eq!(p.strides(), (4, 2, 5));

    // Zero tuning values are clamped to 1, never panic.
    let p = Prefetcher::resolve(
        PrefetchMode::Custom {
            stride_codes: 0,
            depth_codes: 0,
            stride_visit: 0,
        },
        7,
    );
    assert_eq!(p.strides(), (1, 1, 1));
}

#[test]
fn test_hints_never_read_out_of_bounds() {
    let store = VectorStore::new(4);
    store.insert_at(0, &[1.0, 2.0, 3.0, 4.0]);
    store.insert_at(1, &[5.0, 6.0, 7.0, 8.0]);
    let vectors = store.read();
    let visited = VisitedSet::new(2);
    let p = Prefetcher::resolve(PrefetchMode::Hardcoded, 3);

    // Lookahead past the end of the neighbor list is a no-op.
    let neighbors = vec![0, 1];
    for i in 0..neighbors.len() {
        p.hint_codes(&vectors, &neighbors, i);
        p.hint_visited(&visited, &neighbors, i);
    }
    // Hinting an id outside the visited set is also a no-op.
    p.hint_visited(&visited, &[0, 0, 0, 99], 0);
}

#[test]
fn test_prefetch_read_accepts_any_address() {
    let data = [0u8; 64];
    prefetch_read(data.as_ptr());
    prefetch_read(std::ptr::null());
}

#[test]
fn test_mode_serde_round_trip() {
    let modes = [
        PrefetchMode::Disabled,
        PrefetchMode::Hardcoded,
        PrefetchMode::Custom {
            stride_codes: 2,
            depth_codes: 1,
            stride_visit: 3,
        },
    ];
    for mode in modes {
        let json = serde_json::to_string(&mode).unwrap();
        let back: PrefetchMode = serde_json::from_str(&json).unwrap();
        assert_eq!(mode, back);
    }
}
