//! Operation selection and dispatch
//!
//! Each operation is a variant of a closed enum and carries the input kind
//! it needs, so a sparse factorization can never be handed a dense matrix.

use std::fmt;
use std::str::FromStr;
use serde::Serialize;
use stepwise_core::{EngineConfig, StepwiseError};
use tracing::{debug, warn};
use crate::ldlt::decompose_ldlt;
use crate::log::{DecompositionLog, Outcome};
use crate::lu::{decompose_lu, decompose_plu};
use crate::parse::{parse_any, ParsedMatrix};
use crate::rref::{find_nullspace, find_rref};
use crate::sparse::SparseSymmetricMatrix;
use crate::types::Matrix;

/// Available operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Lu,
    Plu,
    Ldlt,
    SparseLdlt,
    Rref,
    Nullspace,
}

/// Input representation an operation consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Dense,
    SparseSymmetric,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Lu,
        OperationKind::Plu,
        OperationKind::Ldlt,
        OperationKind::SparseLdlt,
        OperationKind::Rref,
        OperationKind::Nullspace,
    ];

    /// Display name, also accepted by `from_str`
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Lu => "LU",
            OperationKind::Plu => "PLU",
            OperationKind::Ldlt => "LDLt",
            OperationKind::SparseLdlt => "Sparse-LDLt",
            OperationKind::Rref => "RREF",
            OperationKind::Nullspace => "Nullspace",
        }
    }

    pub fn input_kind(&self) -> InputKind {
        match self {
            OperationKind::SparseLdlt => InputKind::SparseSymmetric,
            _ => InputKind::Dense,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OperationKind::Lu => "LU decomposition without pivoting, logging L and U after each column",
            OperationKind::Plu => "LU of P·M where P moves each column's largest value onto the diagonal",
            OperationKind::Ldlt => "LDLt of a symmetric matrix, logging the working matrix after each row",
            OperationKind::SparseLdlt => "In-place LDLt of a symmetric matrix in skyline storage",
            OperationKind::Rref => "Reduced row echelon form",
            OperationKind::Nullspace => "Basis of the null space, one vector per column",
        }
    }
}

impl FromStr for OperationKind {
    type Err = StepwiseError;

    /// Case-insensitive; `-`, `_` and spaces are ignored ("sparse_ldlt" works)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "lu" => Ok(OperationKind::Lu),
            "plu" => Ok(OperationKind::Plu),
            "ldlt" => Ok(OperationKind::Ldlt),
            "sparseldlt" => Ok(OperationKind::SparseLdlt),
            "rref" => Ok(OperationKind::Rref),
            "nullspace" => Ok(OperationKind::Nullspace),
            _ => Err(StepwiseError::unknown_operation(s)),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation together with its input
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Lu(Matrix),
    Plu(Matrix),
    Ldlt(Matrix),
    SparseLdlt(SparseSymmetricMatrix),
    Rref(Matrix),
    Nullspace(Matrix),
}

impl Request {
    /// Pair a dense matrix with an operation, compressing it for Sparse-LDLt
    pub fn from_dense(kind: OperationKind, m: Matrix, config: &EngineConfig) -> Result<Self, StepwiseError> {
        Ok(match kind {
            OperationKind::Lu => Request::Lu(m),
            OperationKind::Plu => Request::Plu(m),
            OperationKind::Ldlt => Request::Ldlt(m),
            OperationKind::SparseLdlt => Request::SparseLdlt(
                SparseSymmetricMatrix::from_dense(&m, config).map_err(|e| {
                    e.in_operation(kind.as_str())
                        .with_note(format!("compressing a {}×{} dense matrix to skyline storage", m.rows(), m.cols()))
                })?,
            ),
            OperationKind::Rref => Request::Rref(m),
            OperationKind::Nullspace => Request::Nullspace(m),
        })
    }

    /// Parse text in either format and convert it to what `kind` consumes
    pub fn from_text(kind: OperationKind, text: &str, config: &EngineConfig) -> Result<Self, StepwiseError> {
        match (parse_any(text)?, kind) {
            (ParsedMatrix::Sparse(s), OperationKind::SparseLdlt) => Ok(Request::SparseLdlt(s)),
            (ParsedMatrix::Sparse(s), _) => Request::from_dense(kind, s.to_dense(), config),
            (ParsedMatrix::Dense(m), _) => Request::from_dense(kind, m, config),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Request::Lu(_) => OperationKind::Lu,
            Request::Plu(_) => OperationKind::Plu,
            Request::Ldlt(_) => OperationKind::Ldlt,
            Request::SparseLdlt(_) => OperationKind::SparseLdlt,
            Request::Rref(_) => OperationKind::Rref,
            Request::Nullspace(_) => OperationKind::Nullspace,
        }
    }
}

/// Run one operation. The request's input is never modified.
pub fn run(request: &Request, config: &EngineConfig) -> Result<Outcome, StepwiseError> {
    let kind = request.kind();
    debug!(operation = %kind, "running");

    let outcome = match request {
        Request::Lu(m) => decompose_lu(m),
        Request::Plu(m) => decompose_plu(m),
        Request::Ldlt(m) => decompose_ldlt(m, config),
        Request::SparseLdlt(s) => run_sparse_ldlt(s, config),
        Request::Rref(m) => find_rref(m, config),
        Request::Nullspace(m) => find_nullspace(m, config),
    }?;

    if let Outcome::NoDecomposition { pivot_column } = outcome {
        warn!(operation = %kind, pivot_column, "no decomposition");
    }
    Ok(outcome)
}

/// Factor a copy and expand the compact factors.
///
/// Extras: "L" (unit lower), "D" (diagonal) and "LD", the factored storage
/// itself as a symmetric matrix (L below the diagonal, D on it).
fn run_sparse_ldlt(s: &SparseSymmetricMatrix, config: &EngineConfig) -> Result<Outcome, StepwiseError> {
    let mut factored = s.clone();
    factored.factor_ldlt(config)?;

    let mut log = DecompositionLog::new();
    log.push_extra("L", factored.factored_l());
    log.push_extra("D", factored.factored_d());
    log.push_extra("LD", factored.to_dense());
    Ok(Outcome::complete(log))
}
