//! Row-swap (permutation) matrix selection for PLU

use stepwise_core::StepwiseError;
use crate::types::Matrix;

/// Build P such that P·M carries each column's largest value onto the diagonal.
///
/// For column c the rows c..n of the *input* M are scanned top to bottom and
/// the row holding the largest raw value (ties go to the first) is swapped
/// into position c of P. M itself is never permuted, so later columns are
/// scanned in M's original row order. Comparison is by value, not by
/// magnitude: a large negative entry never wins.
pub fn row_swap_matrix(m: &Matrix) -> Result<Matrix, StepwiseError> {
    if !m.is_square() {
        return Err(StepwiseError::not_square(m.rows(), m.cols()));
    }

    let n = m.rows();
    let a = m.as_dmatrix();
    let mut p = Matrix::identity(n);

    for col in 0..n {
        let mut max_row = col;
        for row in col..n {
            if a[(row, col)] > a[(max_row, col)] {
                max_row = row;
            }
        }

        if max_row != col {
            p.as_dmatrix_mut().swap_rows(col, max_row);
        }
    }

    Ok(p)
}

/// True for a square 0/1 matrix with exactly one 1 per row and column
pub fn is_permutation(p: &Matrix) -> bool {
    if !p.is_square() {
        return false;
    }
    let a = p.as_dmatrix();
    let n = p.rows();
    let entries_ok = a.iter().all(|&x| x == 0.0 || x == 1.0);
    let rows_ok = (0..n).all(|i| a.row(i).sum() == 1.0);
    let cols_ok = (0..n).all(|j| a.column(j).sum() == 1.0);
    entries_ok && rows_ok && cols_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[f64]]) -> Matrix {
        Matrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_swaps_zero_pivot() {
        let p = row_swap_matrix(&m(&[&[0.0, 1.0], &[1.0, 0.0]])).unwrap();
        assert_eq!(p, m(&[&[0.0, 1.0], &[1.0, 0.0]]));
        assert!(is_permutation(&p));
    }

    #[test]
    fn test_already_dominant_is_identity() {
        let p = row_swap_matrix(&m(&[&[6.0, 3.0], &[4.0, 3.0]])).unwrap();
        assert_eq!(p, Matrix::identity(2));
    }

    #[test]
    fn test_ties_keep_first_row() {
        let p = row_swap_matrix(&m(&[&[2.0, 1.0], &[2.0, 5.0]])).unwrap();
        assert_eq!(p, Matrix::identity(2));
    }

    #[test]
    fn test_raw_value_not_magnitude() {
        // -10 is the largest magnitude but 1 is the largest value
        let p = row_swap_matrix(&m(&[&[-10.0, 0.0], &[1.0, 1.0]])).unwrap();
        assert_eq!(p, m(&[&[0.0, 1.0], &[1.0, 0.0]]));
    }

    #[test]
    fn test_product_is_orthogonal() {
        let input = m(&[&[1.0, 2.0, 3.0], &[7.0, 0.0, 1.0], &[4.0, 9.0, 2.0]]);
        let p = row_swap_matrix(&input).unwrap();
        assert!(is_permutation(&p));
        let ppt = p.mul(&p.transpose()).unwrap();
        assert_eq!(ppt, Matrix::identity(3));
    }

    #[test]
    fn test_input_untouched() {
        let input = m(&[&[0.0, 1.0], &[1.0, 0.0]]);
        let before = input.clone();
        row_swap_matrix(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_requires_square() {
        let err = row_swap_matrix(&m(&[&[1.0, 2.0, 3.0]])).unwrap_err();
        assert_eq!(err.code, stepwise_core::codes::NOT_SQUARE);
    }
}
