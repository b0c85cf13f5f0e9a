//! Dense LDLt decomposition by symmetric rank-1 downdates

use nalgebra::DMatrix;
use stepwise_core::{EngineConfig, StepwiseError};
use stepwise_core::tolerance::is_negligible;
use tracing::{debug, warn};
use crate::log::{DecompositionLog, Outcome};
use crate::types::Matrix;

/// LDLt of a symmetric matrix, tolerating zero pivots.
///
/// Row r takes D[r][r] from the working matrix. A usable pivot turns column
/// r of the working matrix into column r of L (divided by the pivot) and
/// subtracts the outer product from the working matrix. A negligible pivot
/// (see `EngineConfig::pivot_epsilon`) puts e_r in L instead and leaves the
/// working matrix alone, so L stays unit lower-triangular on singular input.
///
/// Result groups: steps "A" (working matrix after each row), extras "L",
/// "D" and "LDLt" (the reconstruction L·D·Lᵗ).
pub fn decompose_ldlt(m: &Matrix, config: &EngineConfig) -> Result<Outcome, StepwiseError> {
    if !m.is_square() {
        return Err(StepwiseError::not_square(m.rows(), m.cols()).in_operation("LDLt"));
    }
    if let Some((row, col)) = m.first_asymmetry(config.symmetry_tolerance) {
        return Err(StepwiseError::not_symmetric(row, col).in_operation("LDLt"));
    }

    let n = m.rows();
    let mut a = m.as_dmatrix().clone();
    let mut l = DMatrix::<f64>::zeros(n, n);
    let mut d = DMatrix::<f64>::zeros(n, n);
    let mut log_a = Vec::with_capacity(n);

    for r in 0..n {
        let pivot = a[(r, r)];
        d[(r, r)] = pivot;

        if is_negligible(pivot, config.pivot_epsilon) {
            warn!(row = r, pivot, "negligible pivot, using unit column in L");
            l[(r, r)] = 1.0;
        } else {
            let column = a.column(r).clone_owned();
            let l_col = &column / pivot;
            a -= &l_col * column.transpose();
            l.set_column(r, &l_col);
        }

        debug!(row = r, pivot, "rank-1 update");
        log_a.push(Matrix::from_dmatrix(a.clone()));
    }

    // columns were filled whole; only the lower triangle belongs to L
    for i in 0..n {
        for j in (i + 1)..n {
            l[(i, j)] = 0.0;
        }
    }

    let reconstruction = &l * &d * l.transpose();

    let mut log = DecompositionLog::new();
    log.push_steps("A", log_a)?;
    log.push_extra("L", Matrix::from_dmatrix(l));
    log.push_extra("D", Matrix::from_dmatrix(d));
    log.push_extra("LDLt", Matrix::from_dmatrix(reconstruction));
    Ok(Outcome::complete(log))
}
