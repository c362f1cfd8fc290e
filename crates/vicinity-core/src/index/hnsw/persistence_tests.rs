//! Tests for the `persistence` module and snapshot round-trips.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

use super::index::HnswIndex;
use super::params::{HnswParams, SearchParams};
use super::persistence::{Snapshot, SNAPSHOT_VERSION};
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::Error;

fn built_index(n: usize, seed: u64) -> HnswIndex {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f32> = (0..n * 4).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let dataset = Dataset::dense((0..n as u64).collect(), 4, data).unwrap();
    let index = HnswIndex::new(HnswParams::new(DistanceMetric::Euclidean, 4, 8, 64)).unwrap();
    index.build(&dataset).unwrap();
    index
}

#[test]
fn test_save_load_round_trip_preserves_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.bin");
    let index = built_index(50, 1);
    index.remove(13).unwrap();
    index.save(&path).unwrap();

    let loaded = HnswIndex::load(&path).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.tombstone_count(), 1);
    assert_eq!(loaded.dim(), 4);

    let search = SearchParams::new(64).with_skip_ratio(1.0);
    for seed in 0..5u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let query: Vec<f32> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
        assert_eq!(
            index.knn_search(&query, 10, &search).unwrap(),
            loaded.knn_search(&query, 10, &search).unwrap()
        );
    }
}

#[test]
fn test_stream_round_trip() {
    let index = built_index(20, 2);
    let mut buf = Vec::new();
    index.save_to(&mut buf).unwrap();
    let loaded = HnswIndex::load_from(buf.as_slice()).unwrap();
    assert_eq!(loaded.len(), 20);
}

#[test]
fn test_truncated_snapshot_fails_cleanly() {
    let index = built_index(20, 3);
    let mut buf = Vec::new();
    index.save_to(&mut buf).unwrap();
    buf.truncate(buf.len() / 2);
    let err = HnswIndex::load_from(buf.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn test_garbage_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.bin");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"not a snapshot")
        .unwrap();
    let err = HnswIndex::load(&path).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = HnswIndex::load(&dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_unknown_version_rejected() {
    let index = built_index(5, 4);
    let mut buf = Vec::new();
    index.save_to(&mut buf).unwrap();
    let mut snapshot: Snapshot = bincode::deserialize(&buf).unwrap();
    snapshot.version = SNAPSHOT_VERSION + 1;
    let bytes = bincode::serialize(&snapshot).unwrap();
    let err = Snapshot::read_from(bytes.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn test_inconsistent_snapshot_rejected() {
    let index = built_index(5, 5);
    let mut buf = Vec::new();
    index.save_to(&mut buf).unwrap();
    let mut snapshot: Snapshot = bincode::deserialize(&buf).unwrap();
    // Drop one vector's worth of floats: arena no longer matches the arena
    // slot count.
    snapshot.vectors.truncate(snapshot.vectors.len() - 4);
    let bytes = bincode::serialize(&snapshot).unwrap();
    let err = Snapshot::read_from(bytes.as_slice()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn test_save_replaces_file_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.bin");
    let index = built_index(20, 6);
    index.save(&path).unwrap();

    index.remove(0).unwrap();
    index.save(&path).unwrap();

    // No temp file left behind, and the file reflects the second save.
    assert!(!path.with_extension("tmp").exists());
    let loaded = HnswIndex::load(&path).unwrap();
    assert_eq!(loaded.len(), 19);
    assert!(!loaded.contains(0));
}

#[test]
fn test_empty_index_round_trip() {
    let index = HnswIndex::new(HnswParams::new(DistanceMetric::Euclidean, 4, 8, 64)).unwrap();
    let mut buf = Vec::new();
    index.save_to(&mut buf).unwrap();
    let loaded = HnswIndex::load_from(buf.as_slice()).unwrap();
    assert!(loaded.is_empty());
    assert!(loaded
        .knn_search(&[0.0; 4], 1, &SearchParams::new(8))
        .unwrap()
        .is_empty());
}
