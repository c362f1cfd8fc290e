//! Tests for the `vector_store` module.

use super::vector_store::VectorStore;

#[test]
fn test_insert_and_get() {
    let store = VectorStore::new(3);
    store.insert_at(0, &[1.0, 2.0, 3.0]);
    store.insert_at(2, &[7.0, 8.0, 9.0]); // gap at slot 1 is zero-filled
    assert_eq!(store.slots(), 3);

    let vectors = store.read();
    assert_eq!(vectors.get(0), &[1.0, 2.0, 3.0]);
    assert_eq!(vectors.get(1), &[0.0, 0.0, 0.0]);
    assert_eq!(vectors.get(2), &[7.0, 8.0, 9.0]);
}

#[test]
fn test_overwrite_slot() {
    let store = VectorStore::new(2);
    store.insert_at(0, &[1.0, 1.0]);
    store.insert_at(0, &[2.0, 2.0]);
    assert_eq!(store.slots(), 1);
    assert_eq!(store.read().get(0), &[2.0, 2.0]);
}

#[test]
fn test_vector_bytes() {
    assert_eq!(VectorStore::new(32).vector_bytes(), 128);
    assert_eq!(VectorStore::new(128).vector_bytes(), 512);
}

#[test]
fn test_with_data_and_raw_round_trip() {
    let data = vec![1.0, 2.0, 3.0, 4.0];
    let store = VectorStore::with_data(2, data.clone());
    assert_eq!(store.slots(), 2);
    assert_eq!(store.raw(), data);
}

#[test]
fn test_guard_prefetch_is_side_effect_free() {
    let store = VectorStore::new(64);
    store.insert_at(0, &vec![1.5; 64]);
    let vectors = store.read();
    vectors.prefetch(0, 4);
    vectors.prefetch(99, 1); // out of range: no-op
    assert_eq!(vectors.get(0)[0], 1.5);
}
