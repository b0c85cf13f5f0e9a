//! Orthogonal projection of a vector onto each vector of a basis

use nalgebra::{DMatrix, DVector};
use stepwise_core::{EngineConfig, StepwiseError};
use stepwise_core::tolerance::is_negligible;
use crate::types::Matrix;

/// Project `v` onto every column of `basis`.
///
/// Column k of the result is `((v·b)/‖b‖²)·b` for the k-th column b. The
/// basis does not have to be orthogonal; each projection is independent.
pub fn project_onto_basis(v: &[f64], basis: &Matrix, config: &EngineConfig) -> Result<Matrix, StepwiseError> {
    if v.len() != basis.rows() {
        return Err(StepwiseError::invalid_shape(format!(
            "vector has {} entries but basis vectors have {}",
            v.len(), basis.rows()
        )));
    }

    let v = DVector::from_column_slice(v);
    let b = basis.as_dmatrix();
    let mut projection = DMatrix::<f64>::zeros(b.nrows(), b.ncols());

    for (k, column) in b.column_iter().enumerate() {
        let norm = column.norm();
        if is_negligible(norm, config.pivot_epsilon) {
            return Err(StepwiseError::domain_error(format!("basis vector {} has zero length", k))
                .with_suggestion("Remove zero vectors from the basis"));
        }
        let scale = v.dot(&column) / column.norm_squared();
        projection.set_column(k, &(column * scale));
    }

    Ok(Matrix::from_dmatrix(projection))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[f64]]) -> Matrix {
        Matrix::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_project_onto_axes() {
        let basis = Matrix::identity(3);
        let p = project_onto_basis(&[3.0, -1.0, 2.0], &basis, &EngineConfig::default()).unwrap();
        assert_eq!(p, m(&[&[3.0, 0.0, 0.0], &[0.0, -1.0, 0.0], &[0.0, 0.0, 2.0]]));
    }

    #[test]
    fn test_project_non_unit_vector() {
        // v = (2, 0) onto b = (1, 1): (2/2)·(1, 1)
        let basis = m(&[&[1.0], &[1.0]]);
        let p = project_onto_basis(&[2.0, 0.0], &basis, &EngineConfig::default()).unwrap();
        assert!(p.approx_eq(&m(&[&[1.0], &[1.0]]), 1e-12));
    }

    #[test]
    fn test_residual_is_orthogonal() {
        let basis = m(&[&[1.0], &[2.0], &[-1.0]]);
        let v = [0.5, 3.0, 4.0];
        let p = project_onto_basis(&v, &basis, &EngineConfig::default()).unwrap();

        let residual: Vec<f64> = (0..3).map(|i| v[i] - p.get(i, 0).unwrap()).collect();
        let dot: f64 = (0..3).map(|i| residual[i] * basis.get(i, 0).unwrap()).sum();
        assert!(dot.abs() < 1e-12);
    }

    #[test]
    fn test_zero_basis_vector() {
        let basis = m(&[&[1.0, 0.0], &[0.0, 0.0]]);
        let err = project_onto_basis(&[1.0, 1.0], &basis, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.code, stepwise_core::codes::DOMAIN_ERROR);
        assert!(err.message.contains("basis vector 1"));
    }

    #[test]
    fn test_length_mismatch() {
        let err = project_onto_basis(&[1.0], &Matrix::identity(2), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.code, stepwise_core::codes::INVALID_SHAPE);
    }
}
