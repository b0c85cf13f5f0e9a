//! Decomposition logs: the ordered, named results an engine hands back

use serde::Serialize;
use stepwise_core::StepwiseError;
use crate::types::Matrix;

/// One named entry of a decomposition log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultGroup {
    /// One snapshot per elimination step
    Steps { name: String, snapshots: Vec<Matrix> },
    /// A single final matrix
    Extra { name: String, matrix: Matrix },
}

impl ResultGroup {
    pub fn name(&self) -> &str {
        match self {
            ResultGroup::Steps { name, .. } | ResultGroup::Extra { name, .. } => name,
        }
    }
}

/// Ordered sequence of step series and extra matrices.
///
/// Every step series in one log has the same number of snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecompositionLog {
    groups: Vec<ResultGroup>,
}

impl DecompositionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step series; its length must match the series already present
    pub fn push_steps(&mut self, name: impl Into<String>, snapshots: Vec<Matrix>) -> Result<(), StepwiseError> {
        let name = name.into();
        if let Some(expected) = self.step_count() {
            if snapshots.len() != expected {
                return Err(StepwiseError::internal(format!(
                    "step series '{}' has {} snapshots, expected {}",
                    name, snapshots.len(), expected
                )));
            }
        }
        self.groups.push(ResultGroup::Steps { name, snapshots });
        Ok(())
    }

    pub fn push_extra(&mut self, name: impl Into<String>, matrix: Matrix) {
        self.groups.push(ResultGroup::Extra { name: name.into(), matrix });
    }

    pub fn groups(&self) -> &[ResultGroup] {
        &self.groups
    }

    /// Number of steps shared by all step series, `None` if there are none
    pub fn step_count(&self) -> Option<usize> {
        self.groups.iter().find_map(|g| match g {
            ResultGroup::Steps { snapshots, .. } => Some(snapshots.len()),
            ResultGroup::Extra { .. } => None,
        })
    }

    pub fn steps(&self, name: &str) -> Option<&[Matrix]> {
        self.groups.iter().find_map(|g| match g {
            ResultGroup::Steps { name: n, snapshots } if n == name => Some(snapshots.as_slice()),
            _ => None,
        })
    }

    pub fn extra(&self, name: &str) -> Option<&Matrix> {
        self.groups.iter().find_map(|g| match g {
            ResultGroup::Extra { name: n, matrix } if n == name => Some(matrix),
            _ => None,
        })
    }

    /// Last snapshot of a step series
    pub fn final_step(&self, name: &str) -> Option<&Matrix> {
        self.steps(name).and_then(|s| s.last())
    }
}

/// Result of running one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Complete { log: DecompositionLog },
    /// Unpivoted elimination hit an exact zero pivot
    NoDecomposition { pivot_column: usize },
}

impl Outcome {
    pub fn complete(log: DecompositionLog) -> Self {
        Outcome::Complete { log }
    }

    pub fn log(&self) -> Option<&DecompositionLog> {
        match self {
            Outcome::Complete { log } => Some(log),
            Outcome::NoDecomposition { .. } => None,
        }
    }

    pub fn into_log(self) -> Option<DecompositionLog> {
        match self {
            Outcome::Complete { log } => Some(log),
            Outcome::NoDecomposition { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_count_invariant() {
        let mut log = DecompositionLog::new();
        assert_eq!(log.step_count(), None);

        log.push_steps("L", vec![Matrix::identity(2), Matrix::identity(2)]).unwrap();
        log.push_extra("P", Matrix::identity(2));
        assert_eq!(log.step_count(), Some(2));

        let err = log.push_steps("U", vec![Matrix::identity(2)]).unwrap_err();
        assert_eq!(err.code, stepwise_core::codes::INTERNAL);
        assert!(log.push_steps("U", vec![Matrix::zeros(2, 2), Matrix::identity(2)]).is_ok());
    }

    #[test]
    fn test_lookup_by_name() {
        let mut log = DecompositionLog::new();
        log.push_steps("A", vec![Matrix::zeros(1, 1), Matrix::identity(1)]).unwrap();
        log.push_extra("D", Matrix::identity(3));

        assert_eq!(log.steps("A").map(|s| s.len()), Some(2));
        assert_eq!(log.final_step("A"), Some(&Matrix::identity(1)));
        assert_eq!(log.extra("D"), Some(&Matrix::identity(3)));
        assert!(log.extra("A").is_none());
        assert!(log.steps("D").is_none());
        let names: Vec<&str> = log.groups().iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["A", "D"]);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(Outcome::NoDecomposition { pivot_column: 0 }).unwrap();
        assert_eq!(json["status"], "no_decomposition");
        assert_eq!(json["pivot_column"], 0);

        let mut log = DecompositionLog::new();
        log.push_extra("RREF", Matrix::identity(1));
        let json = serde_json::to_value(Outcome::complete(log)).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["log"]["groups"][0]["kind"], "extra");
        assert_eq!(json["log"]["groups"][0]["name"], "RREF");
    }
}
