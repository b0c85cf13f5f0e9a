//! Symmetric matrices in skyline (profile) storage, with in-place LDLt
//!
//! Only the upper triangle by column is kept, which by symmetry is the lower
//! triangle by row. Column `col` is stored as one contiguous run that starts
//! at its diagonal and climbs to the first stored row, the column's skyline:
//!
//! ```text
//! data = [ a00 | a11 a01 | a22 a12 a02 | a33 a23 | ... ]
//!          ^col 0 ^col 1    ^col 2        ^col 3 (skyline 2)
//! ```
//!
//! so `(row, col)` with `skyline[col] <= row <= col` lives at
//! `diagonal_indices[col] + (col - row)`. Rows above the skyline are
//! structural zeros and take no space.

use std::fmt;
use serde::{Deserialize, Serialize};
use stepwise_core::{EngineConfig, StepwiseError};
use stepwise_core::tolerance::is_negligible;
use tracing::debug;
use crate::types::{format_entry, Matrix};

/// Raw storage of a [`SparseSymmetricMatrix`], as (de)serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkylineParts {
    pub data: Vec<f64>,
    pub diagonal_indices: Vec<usize>,
}

/// Symmetric n×n matrix in skyline storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SkylineParts", into = "SkylineParts")]
pub struct SparseSymmetricMatrix {
    data: Vec<f64>,
    diagonal_indices: Vec<usize>,
    /// First stored row of each column, derived once from the run lengths
    skyline: Vec<usize>,
}

impl SparseSymmetricMatrix {
    /// Build from a flat value array and the position of each diagonal.
    ///
    /// Fails with `INVALID_SHAPE` unless the indices start at 0, strictly
    /// increase, every run fits between row 0 and its diagonal, and `data`
    /// ends exactly where the last run can end.
    pub fn from_parts(data: Vec<f64>, diagonal_indices: Vec<usize>) -> Result<Self, StepwiseError> {
        let n = diagonal_indices.len();
        if n == 0 {
            return Err(StepwiseError::invalid_shape("sparse matrix has no columns"));
        }
        if diagonal_indices[0] != 0 {
            return Err(StepwiseError::invalid_shape(format!(
                "first diagonal must be at index 0, found {}", diagonal_indices[0]
            )));
        }

        let mut skyline = Vec::with_capacity(n);
        for col in 0..n {
            let start = diagonal_indices[col];
            let end = diagonal_indices.get(col + 1).copied().unwrap_or(data.len());
            if end <= start {
                return Err(StepwiseError::invalid_shape(format!(
                    "column {} has an empty run ({}..{})", col, start, end
                )));
            }
            let run = end - start;
            if run > col + 1 {
                return Err(StepwiseError::invalid_shape(format!(
                    "column {} stores {} values but only {} fit above the diagonal",
                    col, run, col + 1
                )));
            }
            skyline.push(col + 1 - run);
        }

        Ok(Self { data, diagonal_indices, skyline })
    }

    /// Compress a dense symmetric matrix.
    ///
    /// A column's skyline is its first nonzero row; the diagonal is always
    /// stored, and zeros below the skyline are stored explicitly.
    pub fn from_dense(dense: &Matrix, config: &EngineConfig) -> Result<Self, StepwiseError> {
        if !dense.is_square() {
            return Err(StepwiseError::not_square(dense.rows(), dense.cols()));
        }
        if let Some((row, col)) = dense.first_asymmetry(config.symmetry_tolerance) {
            return Err(StepwiseError::not_symmetric(row, col));
        }

        let a = dense.as_dmatrix();
        let n = dense.rows();
        let mut data = Vec::new();
        let mut diagonal_indices = Vec::with_capacity(n);
        let mut skyline = Vec::with_capacity(n);

        for col in 0..n {
            let sky = (0..col).find(|&row| a[(row, col)] != 0.0).unwrap_or(col);
            diagonal_indices.push(data.len());
            skyline.push(sky);
            data.push(a[(col, col)]);
            for row in (sky..col).rev() {
                data.push(a[(row, col)]);
            }
        }

        Ok(Self { data, diagonal_indices, skyline })
    }

    /// Number of rows (and columns)
    pub fn n(&self) -> usize {
        self.diagonal_indices.len()
    }

    /// Number of stored values
    pub fn stored_len(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn diagonal_indices(&self) -> &[usize] {
        &self.diagonal_indices
    }

    pub fn skyline(&self) -> &[usize] {
        &self.skyline
    }

    /// Position in `data` of (row, col), if that entry is stored
    pub fn stored_index(&self, row: usize, col: usize) -> Option<usize> {
        let (row, col) = if row > col { (col, row) } else { (row, col) };
        if col >= self.n() || row < self.skyline[col] {
            return None;
        }
        Some(self.slot(row, col))
    }

    /// Index arithmetic for a known-stored entry (row <= col, row >= skyline)
    fn slot(&self, row: usize, col: usize) -> usize {
        debug_assert!(row <= col && row >= self.skyline[col]);
        self.diagonal_indices[col] + (col - row)
    }

    fn diag(&self, col: usize) -> f64 {
        self.data[self.diagonal_indices[col]]
    }

    /// Element at (row, col); `None` outside the matrix, 0 above the skyline
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.n() || col >= self.n() {
            return None;
        }
        Some(self.stored_index(row, col).map_or(0.0, |i| self.data[i]))
    }

    /// Expand to a dense symmetric matrix
    pub fn to_dense(&self) -> Matrix {
        let n = self.n();
        let mut dense = Matrix::zeros(n, n);
        let a = dense.as_dmatrix_mut();
        for col in 0..n {
            for row in self.skyline[col]..=col {
                let value = self.data[self.slot(row, col)];
                a[(row, col)] = value;
                a[(col, row)] = value;
            }
        }
        dense
    }

    /// In-place LDLt over the stored profile, without pivoting.
    ///
    /// Afterwards each stored off-diagonal (row, col) holds L[col][row] and
    /// each diagonal holds D[col]; see [`factored_l`](Self::factored_l) and
    /// [`factored_d`](Self::factored_d). Work is proportional to the profile,
    /// not n³.
    ///
    /// Fails with `NEGLIGIBLE_PIVOT` when a diagonal that column `col` must
    /// divide by is below `config.sparse_pivot_epsilon`. Columns before `col`
    /// are then already factored and `col` onward still hold input values.
    pub fn factor_ldlt(&mut self, config: &EngineConfig) -> Result<(), StepwiseError> {
        let n = self.n();

        for col in 1..n {
            let sky_col = self.skyline[col];

            for row in sky_col..col {
                let d = self.diag(row);
                if is_negligible(d, config.sparse_pivot_epsilon) {
                    return Err(StepwiseError::negligible_pivot(row, col, d).in_operation("Sparse-LDLt"));
                }
            }

            // g(row, col) = a(row, col) - sum_k L(k, row) * g(k, col)
            for row in sky_col..col {
                let start = sky_col.max(self.skyline[row]);
                let mut g = self.data[self.slot(row, col)];
                for k in start..row {
                    g -= self.data[self.slot(k, row)] * self.data[self.slot(k, col)];
                }
                let i = self.slot(row, col);
                self.data[i] = g;
            }

            let mut d_col = self.diag(col);
            for row in sky_col..col {
                let i = self.slot(row, col);
                let d_row = self.diag(row);
                self.data[i] /= d_row;
                d_col -= self.data[i] * self.data[i] * d_row;
            }
            let i = self.diagonal_indices[col];
            self.data[i] = d_col;

            debug!(column = col, skyline = sky_col, d = d_col, "factored column");
        }

        Ok(())
    }

    /// Unit lower-triangular L read from factored storage
    pub fn factored_l(&self) -> Matrix {
        let n = self.n();
        let mut l = Matrix::identity(n);
        let a = l.as_dmatrix_mut();
        for col in 0..n {
            for row in self.skyline[col]..col {
                a[(col, row)] = self.data[self.slot(row, col)];
            }
        }
        l
    }

    /// Diagonal D read from factored storage
    pub fn factored_d(&self) -> Matrix {
        let n = self.n();
        let mut d = Matrix::zeros(n, n);
        let a = d.as_dmatrix_mut();
        for col in 0..n {
            a[(col, col)] = self.diag(col);
        }
        d
    }
}

impl TryFrom<SkylineParts> for SparseSymmetricMatrix {
    type Error = StepwiseError;

    fn try_from(parts: SkylineParts) -> Result<Self, Self::Error> {
        SparseSymmetricMatrix::from_parts(parts.data, parts.diagonal_indices)
    }
}

impl From<SparseSymmetricMatrix> for SkylineParts {
    fn from(m: SparseSymmetricMatrix) -> Self {
        SkylineParts { data: m.data, diagonal_indices: m.diagonal_indices }
    }
}

impl fmt::Display for SparseSymmetricMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.n();
        for row in 0..n {
            for col in 0..n {
                let value = self.get(row, col).unwrap_or(0.0);
                write!(f, "{}\t", format_entry(value))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
