//! Dataset container for build and batch-query input.
//!
//! A [`Dataset`] pairs external 64-bit ids with either dense row-major
//! vectors or CSR-encoded sparse vectors. All format invariants are checked
//! at construction, so downstream code can iterate rows without revalidating.
//!
//! CSR contract: `index_pointers[0] == 0`, pointers non-decreasing, and the
//! `indices`/`values` lengths both equal `index_pointers[last]`.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// Row storage backing a [`Dataset`].
#[derive(Debug, Clone)]
enum Rows {
    /// Row-major dense vectors, `dim` consecutive floats per row.
    Dense(Vec<f32>),
    /// CSR triple. Column indices are strictly less than `dim`.
    Sparse {
        index_pointers: Vec<u32>,
        indices: Vec<u32>,
        values: Vec<f32>,
    },
}

/// A batch of vectors with caller-assigned ids.
#[derive(Debug, Clone)]
pub struct Dataset {
    ids: Vec<u64>,
    dim: usize,
    rows: Rows,
}

impl Dataset {
    /// Creates a dense dataset. `data` is row-major, `ids.len() * dim` floats.
    pub fn dense(ids: Vec<u64>, dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Config("dimension must be > 0".into()));
        }
        if data.len() != ids.len() * dim {
            return Err(Error::Config(format!(
                "dense data length {} does not match {} rows of dimension {}",
                data.len(),
                ids.len(),
                dim
            )));
        }
        Ok(Self {
            ids,
            dim,
            rows: Rows::Dense(data),
        })
    }

    /// Creates a sparse dataset from a CSR triple.
    pub fn from_csr(
        ids: Vec<u64>,
        dim: usize,
        index_pointers: Vec<u32>,
        indices: Vec<u32>,
        values: Vec<f32>,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Config("dimension must be > 0".into()));
        }
        if index_pointers.len() != ids.len() + 1 {
            return Err(Error::MalformedSparseInput(format!(
                "index_pointers length {} must be number of rows + 1 ({})",
                index_pointers.len(),
                ids.len() + 1
            )));
        }
        if index_pointers[0] != 0 {
            return Err(Error::MalformedSparseInput(
                "index_pointers[0] must be 0".into(),
            ));
        }
        for w in index_pointers.windows(2) {
            if w[1] < w[0] {
                return Err(Error::MalformedSparseInput(format!(
                    "index_pointers must be non-decreasing, found {} after {}",
                    w[1], w[0]
                )));
            }
        }
        let nnz = *index_pointers.last().unwrap_or(&0) as usize;
        if indices.len() != nnz {
            return Err(Error::MalformedSparseInput(format!(
                "indices length {} must equal index_pointers[last] ({nnz})",
                indices.len()
            )));
        }
        if values.len() != nnz {
            return Err(Error::MalformedSparseInput(format!(
                "values length {} must equal index_pointers[last] ({nnz})",
                values.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= dim) {
            return Err(Error::MalformedSparseInput(format!(
                "column index {bad} out of range for dimension {dim}"
            )));
        }
        Ok(Self {
            ids,
            dim,
            rows: Rows::Sparse {
                index_pointers,
                indices,
                values,
            },
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// External ids, one per row.
    #[must_use]
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Number of stored non-zeros in row `i`. Dense rows report `dim`.
    #[must_use]
    pub fn row_nnz(&self, i: usize) -> usize {
        match &self.rows {
            Rows::Dense(_) => self.dim,
            Rows::Sparse { index_pointers, .. } => {
                (index_pointers[i + 1] - index_pointers[i]) as usize
            }
        }
    }

    /// Row `i` as a dense vector. Dense rows borrow, sparse rows scatter
    /// into a fresh `dim`-length buffer.
    #[must_use]
    pub fn row(&self, i: usize) -> Cow<'_, [f32]> {
        match &self.rows {
            Rows::Dense(data) => Cow::Borrowed(&data[i * self.dim..(i + 1) * self.dim]),
            Rows::Sparse {
                index_pointers,
                indices,
                values,
            } => {
                let start = index_pointers[i] as usize;
                let end = index_pointers[i + 1] as usize;
                let mut dense = vec![0.0f32; self.dim];
                for (&col, &val) in indices[start..end].iter().zip(&values[start..end]) {
                    dense[col as usize] = val;
                }
                Cow::Owned(dense)
            }
        }
    }
}
