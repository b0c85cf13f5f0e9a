//! LU and PLU decomposition with per-step logging

use nalgebra::DMatrix;
use stepwise_core::StepwiseError;
use tracing::{debug, warn};
use crate::log::{DecompositionLog, Outcome};
use crate::pivot::row_swap_matrix;
use crate::types::Matrix;

/// Doolittle elimination without pivoting.
///
/// Logs the cumulative L and the working U after every eliminated column.
/// An exact zero on the diagonal of U yields `Outcome::NoDecomposition`;
/// retry with [`decompose_plu`].
pub fn decompose_lu(m: &Matrix) -> Result<Outcome, StepwiseError> {
    if !m.is_square() {
        return Err(StepwiseError::not_square(m.rows(), m.cols()).in_operation("LU"));
    }

    let n = m.rows();
    let mut l = DMatrix::<f64>::identity(n, n);
    let mut u = m.as_dmatrix().clone();
    let mut log_l = Vec::with_capacity(n.saturating_sub(1));
    let mut log_u = Vec::with_capacity(n.saturating_sub(1));

    for col in 0..n.saturating_sub(1) {
        let pivot = u[(col, col)];
        if pivot == 0.0 {
            warn!(column = col, "zero pivot, no LU decomposition without pivoting");
            return Ok(Outcome::NoDecomposition { pivot_column: col });
        }

        // elementary[r][c] holds the multiplier used to clear U[r][c]
        let mut elementary = DMatrix::<f64>::identity(n, n);
        for row in (col + 1)..n {
            let value = u[(row, col)];
            if value == 0.0 {
                continue;
            }
            let factor = value / pivot;
            elementary[(row, col)] = factor;
            for j in 0..n {
                let delta = factor * u[(col, j)];
                u[(row, j)] -= delta;
            }
        }

        l = &l * &elementary;
        debug!(column = col, pivot, "eliminated column");

        log_l.push(Matrix::from_dmatrix(l.clone()));
        log_u.push(Matrix::from_dmatrix(u.clone()));
    }

    let mut log = DecompositionLog::new();
    log.push_steps("L", log_l)?;
    log.push_steps("U", log_u)?;
    Ok(Outcome::complete(log))
}

/// Row-swap M with [`row_swap_matrix`], then run [`decompose_lu`] on P·M.
///
/// Appends P as an extra matrix. A no-decomposition outcome is passed
/// through unchanged.
pub fn decompose_plu(m: &Matrix) -> Result<Outcome, StepwiseError> {
    let p = row_swap_matrix(m).map_err(|e| e.in_operation("PLU"))?;
    let permuted = p.mul(m)?;

    match decompose_lu(&permuted)? {
        Outcome::Complete { mut log } => {
            log.push_extra("P", p);
            Ok(Outcome::complete(log))
        }
        other => Ok(other),
    }
}
