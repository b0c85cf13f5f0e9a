//! Core matrix type

use std::fmt;
use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};
use stepwise_core::StepwiseError;
use stepwise_core::tolerance::approx_eq;

/// Dense rectangular matrix of f64, 0-indexed by (row, column)
///
/// Thin wrapper over `nalgebra::DMatrix` that validates shape on
/// construction and (de)serializes as a list of rows. `Clone` is a deep
/// copy, which is what step logs rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
    data: DMatrix<f64>,
}

impl Matrix {
    /// Create a matrix from rows, rejecting empty or ragged input
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, StepwiseError> {
        if rows.is_empty() {
            return Err(StepwiseError::invalid_shape("matrix has no rows"));
        }

        let cols = rows[0].len();
        if cols == 0 {
            return Err(StepwiseError::invalid_shape("matrix has no columns"));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(StepwiseError::invalid_shape(format!(
                    "row {} has {} columns, expected {}",
                    i, row.len(), cols
                )));
            }
        }

        let n_rows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Self { data: DMatrix::from_row_slice(n_rows, cols, &flat) })
    }

    /// Wrap an nalgebra matrix (any shape, including zero columns)
    pub fn from_dmatrix(data: DMatrix<f64>) -> Self {
        Self { data }
    }

    pub fn identity(n: usize) -> Self {
        Self { data: DMatrix::identity(n, n) }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { data: DMatrix::zeros(rows, cols) }
    }

    /// Get number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Get number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Get element at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }

    /// Check if matrix is square
    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    /// Square and `A[i][j] ≈ A[j][i]` within a relative tolerance.
    ///
    /// Returns the first offending (row, col) with row < col.
    pub fn first_asymmetry(&self, tol: f64) -> Option<(usize, usize)> {
        if !self.is_square() {
            return Some((0, 0));
        }
        let n = self.rows();
        for i in 0..n {
            for j in (i + 1)..n {
                if !approx_eq(self.data[(i, j)], self.data[(j, i)], tol) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.first_asymmetry(tol).is_none()
    }

    pub fn transpose(&self) -> Matrix {
        Matrix { data: self.data.transpose() }
    }

    /// Matrix product, or `INVALID_SHAPE` when the inner dimensions differ
    pub fn mul(&self, rhs: &Matrix) -> Result<Matrix, StepwiseError> {
        if self.cols() != rhs.rows() {
            return Err(StepwiseError::invalid_shape(format!(
                "cannot multiply {}×{} by {}×{}",
                self.rows(), self.cols(), rhs.rows(), rhs.cols()
            )));
        }
        Ok(Matrix { data: &self.data * &rhs.data })
    }

    /// Entry-wise comparison with a relative tolerance
    pub fn approx_eq(&self, other: &Matrix, tol: f64) -> bool {
        self.rows() == other.rows()
            && self.cols() == other.cols()
            && self.data.iter().zip(other.data.iter()).all(|(&a, &b)| approx_eq(a, b, tol))
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn as_dmatrix_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.data
    }

    /// Convert to nested rows
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows())
            .map(|i| (0..self.cols()).map(|j| self.data[(i, j)]).collect())
            .collect()
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = StepwiseError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Matrix::from_rows(rows)
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(m: Matrix) -> Self {
        m.to_rows()
    }
}

/// Format one entry: integers without a fraction, others to 4 decimals
pub(crate) fn format_entry(value: f64) -> String {
    if value == 0.0 {
        // avoids printing "-0"
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for j in 0..self.cols() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", format_entry(self.data[(i, j)]))?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_creation() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert!(m.is_square());
        assert_eq!(m.get(1, 0), Some(3.0));
        assert_eq!(m.get(2, 2), None);
    }

    #[test]
    fn test_rejects_ragged_and_empty() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(err.code, stepwise_core::codes::INVALID_SHAPE);
        assert!(err.message.contains("row 1 has 1 columns, expected 2"));

        assert!(Matrix::from_rows(vec![]).is_err());
        assert!(Matrix::from_rows(vec![vec![]]).is_err());
    }

    #[test]
    fn test_non_square() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert!(!m.is_square());
        assert_eq!(m.transpose().to_rows(), vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);
    }

    #[test]
    fn test_mul_checks_dims() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(vec![vec![1.0], vec![1.0]]).unwrap();
        assert_eq!(a.mul(&b).unwrap().to_rows(), vec![vec![3.0], vec![7.0]]);
        assert!(b.mul(&a).is_err());
    }

    #[test]
    fn test_symmetry() {
        let sym = Matrix::from_rows(vec![vec![4.0, 2.0], vec![2.0, 5.0]]).unwrap();
        let asym = Matrix::from_rows(vec![vec![4.0, 2.0], vec![1.0, 5.0]]).unwrap();
        assert!(sym.is_symmetric(1e-9));
        assert_eq!(asym.first_asymmetry(1e-9), Some((0, 1)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut m = Matrix::identity(2);
        let snapshot = m.clone();
        m.as_dmatrix_mut()[(0, 1)] = 7.0;
        assert_eq!(snapshot.get(0, 1), Some(0.0));
        assert_eq!(m.get(0, 1), Some(7.0));
    }

    #[test]
    fn test_display() {
        let m = Matrix::from_rows(vec![vec![1.0, -1.5], vec![0.33333333, -0.0]]).unwrap();
        assert_eq!(m.to_string(), "[[1, -1.5], [0.3333, 0]]");
    }

    #[test]
    fn test_serde_rows() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");

        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(serde_json::from_str::<Matrix>("[[1.0],[2.0,3.0]]").is_err());
    }
}
