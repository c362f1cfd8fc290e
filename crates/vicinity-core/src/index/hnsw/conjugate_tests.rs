//! Tests for the `conjugate` module.

use super::conjugate::ConjugateGraph;

#[test]
fn test_add_neighbor_dedups_and_rejects_self_edges() {
    let cg = ConjugateGraph::new();
    assert!(cg.add_neighbor(1, 2));
    assert!(!cg.add_neighbor(1, 2)); // duplicate
    assert!(!cg.add_neighbor(3, 3)); // self-edge
    assert!(cg.add_neighbor(1, 4));
    assert_eq!(cg.neighbors(1), vec![2, 4]);
    assert!(cg.neighbors(9).is_empty());
    assert_eq!(cg.edge_count(), 2);
}

#[test]
fn test_forget_removes_both_directions() {
    let cg = ConjugateGraph::new();
    cg.add_neighbor(1, 2);
    cg.add_neighbor(2, 1);
    cg.add_neighbor(2, 3);
    cg.forget(1);
    assert!(cg.neighbors(1).is_empty());
    assert_eq!(cg.neighbors(2), vec![3]);
}

#[test]
fn test_enhance_merges_shortcut_candidates() {
    let cg = ConjugateGraph::new();
    cg.add_neighbor(10, 30);

    // id 30 (distance 0.5) should displace id 20 (distance 2.0) in the top 2.
    let mut results = vec![(0.1, 0, 10u64), (2.0, 1, 20u64)];
    let merged = cg.enhance(&mut results, 2, |id| (id == 30).then_some((0.5, 2)));
    assert_eq!(merged, 1);
    assert_eq!(results, vec![(0.1, 0, 10), (0.5, 2, 30)]);
}

#[test]
fn test_enhance_ignores_unknown_and_present_ids() {
    let cg = ConjugateGraph::new();
    cg.add_neighbor(10, 20); // already in results
    cg.add_neighbor(10, 99); // score closure cannot place it

    let mut results = vec![(0.1, 0, 10u64), (0.2, 1, 20u64)];
    let merged = cg.enhance(&mut results, 2, |id| (id == 20).then_some((0.2, 1)));
    assert_eq!(merged, 0);
    assert_eq!(results, vec![(0.1, 0, 10), (0.2, 1, 20)]);
}

#[test]
fn test_enhance_breaks_distance_ties_on_internal_index() {
    let cg = ConjugateGraph::new();
    cg.add_neighbor(50, 60);
    cg.add_neighbor(50, 70);

    // 60 and 70 tie on distance; the smaller internal index sorts first
    // even though its external id is larger.
    let mut results = vec![(1.0, 5, 50u64)];
    let merged = cg.enhance(&mut results, 3, |id| match id {
        60 => Some((0.5, 9)),
        70 => Some((0.5, 2)),
        _ => None,
    });
    assert_eq!(merged, 2);
    assert_eq!(results, vec![(0.5, 2, 70), (0.5, 9, 60), (1.0, 5, 50)]);
}

#[test]
fn test_snapshot_round_trip() {
    let cg = ConjugateGraph::new();
    cg.add_neighbor(1, 2);
    cg.add_neighbor(1, 3);
    let back = ConjugateGraph::from_snapshot(cg.snapshot());
    assert_eq!(back.neighbors(1), vec![2, 3]);
    assert_eq!(back.edge_count(), 2);
}
