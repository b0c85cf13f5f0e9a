//! Stepwise Matrix - Step-by-step matrix factorizations
//!
//! Every operation takes its input by reference and returns an [`Outcome`]:
//! an ordered log of named matrices, or the "no decomposition" sentinel when
//! unpivoted LU hits a zero pivot.
//!
//! - LU and PLU (`lu`), logging L and U after each eliminated column
//! - Dense LDLt (`ldlt`), logging the working matrix after each row
//! - RREF and null space (`rref`)
//! - Skyline-stored symmetric matrices with in-place LDLt (`sparse`)
//! - Dense and sparse text formats (`parse`)
//! - Projection onto a basis (`project`)
//!
//! [`operation::run`] dispatches a [`Request`] to the right engine.

mod types;
mod log;
mod pivot;
mod lu;
mod ldlt;
mod rref;
mod sparse;
mod project;
pub mod parse;
pub mod operation;
pub mod helpers;

pub use types::Matrix;
pub use log::{DecompositionLog, Outcome, ResultGroup};
pub use pivot::{is_permutation, row_swap_matrix};
pub use lu::{decompose_lu, decompose_plu};
pub use ldlt::decompose_ldlt;
pub use rref::{find_nullspace, find_rref};
pub use sparse::{SkylineParts, SparseSymmetricMatrix};
pub use project::project_onto_basis;
pub use parse::{MatrixFormat, ParseError, ParsedMatrix};
pub use operation::{run, InputKind, OperationKind, Request};

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::EngineConfig;

    #[test]
    fn test_public_pipeline() {
        let config = EngineConfig::default();
        let request = Request::from_text(OperationKind::Plu, "[0,1;1,0]", &config).unwrap();
        let outcome = run(&request, &config).unwrap();
        let log = outcome.log().unwrap();

        let names: Vec<&str> = log.groups().iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["L", "U", "P"]);
        assert!(is_permutation(log.extra("P").unwrap()));
    }

    #[test]
    fn test_result_names_per_operation() {
        let config = EngineConfig::default();
        let expected: [(OperationKind, &[&str]); 6] = [
            (OperationKind::Lu, &["L", "U"]),
            (OperationKind::Plu, &["L", "U", "P"]),
            (OperationKind::Ldlt, &["A", "L", "D", "LDLt"]),
            (OperationKind::SparseLdlt, &["L", "D", "LD"]),
            (OperationKind::Rref, &["RREF"]),
            (OperationKind::Nullspace, &["Nullspace"]),
        ];

        for (kind, names) in expected {
            let request = Request::from_text(kind, "[2,1;1,3]", &config).unwrap();
            let outcome = run(&request, &config).unwrap();
            let got: Vec<&str> = outcome.log().unwrap().groups().iter().map(|g| g.name()).collect();
            assert_eq!(got, names.to_vec(), "{}", kind);
        }
    }
}
