//! Gauss-Jordan elimination: reduced row echelon form and null space

use nalgebra::DMatrix;
use stepwise_core::{EngineConfig, StepwiseError};
use stepwise_core::tolerance::is_negligible;
use tracing::debug;
use crate::log::{DecompositionLog, Outcome};
use crate::types::Matrix;

/// First (row, column) at or after (row, lead) holding a usable pivot.
///
/// Searches down the current column first, then moves right.
fn find_pivot(work: &DMatrix<f64>, row: usize, lead: usize, tol: f64) -> Option<(usize, usize)> {
    let (height, width) = work.shape();
    for col in lead..width {
        for r in row..height {
            if !is_negligible(work[(r, col)], tol) {
                return Some((r, col));
            }
        }
    }
    None
}

/// Reduce `work` in place, replaying every row operation on `companion`.
///
/// Returns the number of pivot rows (the rank). Pivot rows end up first,
/// each with a leading 1 that is the only nonzero entry in its column.
fn gauss_jordan(work: &mut DMatrix<f64>, mut companion: Option<&mut DMatrix<f64>>, tol: f64) -> usize {
    let (height, width) = work.shape();
    let mut lead = 0;
    let mut rank = 0;

    for row in 0..height {
        let Some((pivot_row, pivot_col)) = find_pivot(work, row, lead, tol) else {
            break;
        };
        lead = pivot_col;

        if pivot_row != row {
            work.swap_rows(pivot_row, row);
            if let Some(c) = companion.as_deref_mut() {
                c.swap_rows(pivot_row, row);
            }
        }

        let pivot = work[(row, lead)];
        for j in 0..width {
            work[(row, j)] /= pivot;
        }
        if let Some(c) = companion.as_deref_mut() {
            for j in 0..c.ncols() {
                c[(row, j)] /= pivot;
            }
        }

        for i in 0..height {
            if i == row {
                continue;
            }
            let factor = work[(i, lead)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..width {
                let delta = factor * work[(row, j)];
                work[(i, j)] -= delta;
            }
            if let Some(c) = companion.as_deref_mut() {
                for j in 0..c.ncols() {
                    let delta = factor * c[(row, j)];
                    c[(i, j)] -= delta;
                }
            }
        }

        debug!(row, column = lead, pivot, "pivot eliminated");
        lead += 1;
        rank += 1;
    }

    rank
}

/// Set entries below the tolerance to exactly zero
fn flush_negligible(m: &mut DMatrix<f64>, tol: f64) {
    for x in m.iter_mut() {
        if is_negligible(*x, tol) {
            *x = 0.0;
        }
    }
}

/// Pivot threshold for `work`: the configured tolerance relative to its
/// largest entry. An all-zero input gets the smallest positive threshold so
/// that only exact zeros are skipped.
fn pivot_tolerance(work: &DMatrix<f64>, config: &EngineConfig) -> f64 {
    (config.elimination_tolerance * work.amax()).max(f64::MIN_POSITIVE)
}

/// Reduced row echelon form of M (any shape).
///
/// Returns a single extra matrix "RREF"; there is no step log. Pivots are
/// judged against the input's largest entry, so RREF(c·M) = RREF(M) for any
/// nonzero c.
pub fn find_rref(m: &Matrix, config: &EngineConfig) -> Result<Outcome, StepwiseError> {
    let mut work = m.as_dmatrix().clone();
    let tol = pivot_tolerance(&work, config);
    let rank = gauss_jordan(&mut work, None, tol);
    flush_negligible(&mut work, config.elimination_tolerance);
    debug!(rank, "rref complete");

    let mut log = DecompositionLog::new();
    log.push_extra("RREF", Matrix::from_dmatrix(work));
    Ok(Outcome::complete(log))
}

/// Basis of { v : M·v = 0 }, one vector per column.
///
/// Mᵗ is reduced while an identity matrix records the row operations; the
/// recorded rows past the rank map Mᵗ to zero rows, so their transposes
/// span the null space of M. A full-rank M gives an n×0 matrix.
pub fn find_nullspace(m: &Matrix, config: &EngineConfig) -> Result<Outcome, StepwiseError> {
    let mut work = m.as_dmatrix().transpose();
    let n = work.nrows();
    let mut record = DMatrix::<f64>::identity(n, n);

    let tol = pivot_tolerance(&work, config);
    let rank = gauss_jordan(&mut work, Some(&mut record), tol);
    let mut basis = record.rows(rank, n - rank).transpose();
    flush_negligible(&mut basis, config.elimination_tolerance);
    debug!(rank, nullity = n - rank, "null space extracted");

    let mut log = DecompositionLog::new();
    log.push_extra("Nullspace", Matrix::from_dmatrix(basis));
    Ok(Outcome::complete(log))
}
