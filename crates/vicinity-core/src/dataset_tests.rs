//! Tests for the `dataset` module, CSR validation in particular.

use super::dataset::Dataset;
use super::error::Error;

#[test]
fn test_dense_rows() {
    let ds = Dataset::dense(vec![10, 20], 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.dim(), 3);
    assert_eq!(ds.row(1).as_ref(), &[4.0, 5.0, 6.0]);
    assert_eq!(ds.row_nnz(0), 3);
}

#[test]
fn test_dense_length_mismatch() {
    let err = Dataset::dense(vec![1, 2], 3, vec![0.0; 5]).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_csr_nonzero_counts() {
    let ds = Dataset::from_csr(
        vec![0, 1, 2],
        8,
        vec![0, 2, 5, 6],
        vec![0, 3, 1, 2, 7, 4],
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    )
    .unwrap();
    assert_eq!(ds.row_nnz(0), 2);
    assert_eq!(ds.row_nnz(1), 3);
    assert_eq!(ds.row_nnz(2), 1);
}

#[test]
fn test_csr_scatters_to_dense() {
    let ds = Dataset::from_csr(vec![7], 4, vec![0, 2], vec![1, 3], vec![0.5, 0.25]).unwrap();
    assert_eq!(ds.row(0).as_ref(), &[0.0, 0.5, 0.0, 0.25]);
}

#[test]
fn test_csr_first_pointer_must_be_zero() {
    let err = Dataset::from_csr(vec![0], 4, vec![1, 2], vec![0], vec![1.0]).unwrap_err();
    assert!(matches!(err, Error::MalformedSparseInput(_)));
}

#[test]
fn test_csr_decreasing_pointers_rejected() {
    let err = Dataset::from_csr(
        vec![0, 1],
        4,
        vec![0, 2, 1],
        vec![0, 1],
        vec![1.0, 2.0],
    )
    .unwrap_err();
    assert!(matches!(err, Error::MalformedSparseInput(_)));
}

#[test]
fn test_csr_length_mismatches_rejected() {
    // indices shorter than index_pointers[last]
    let err =
        Dataset::from_csr(vec![0], 4, vec![0, 2], vec![0], vec![1.0, 2.0]).unwrap_err();
    assert!(matches!(err, Error::MalformedSparseInput(_)));

    // values shorter than index_pointers[last]
    let err = Dataset::from_csr(vec![0], 4, vec![0, 2], vec![0, 1], vec![1.0]).unwrap_err();
    assert!(matches!(err, Error::MalformedSparseInput(_)));

    // pointer array must be rows + 1
    let err = Dataset::from_csr(vec![0, 1], 4, vec![0, 1], vec![0], vec![1.0]).unwrap_err();
    assert!(matches!(err, Error::MalformedSparseInput(_)));
}

#[test]
fn test_csr_column_out_of_range() {
    let err = Dataset::from_csr(vec![0], 4, vec![0, 1], vec![4], vec![1.0]).unwrap_err();
    assert!(matches!(err, Error::MalformedSparseInput(_)));
}

#[test]
fn test_empty_dataset() {
    let ds = Dataset::dense(vec![], 4, vec![]).unwrap();
    assert!(ds.is_empty());
    let ds = Dataset::from_csr(vec![], 4, vec![0], vec![], vec![]).unwrap();
    assert!(ds.is_empty());
}
