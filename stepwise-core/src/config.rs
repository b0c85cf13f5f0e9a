//! Engine configuration
//!
//! Every engine entry point takes an `&EngineConfig`; there is no
//! process-wide numeric setting.

use crate::StepwiseError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Environment variables read by [`EngineConfig::from_env`]
pub mod env_keys {
    pub const PIVOT_EPSILON: &str = "STEPWISE_PIVOT_EPSILON";
    pub const SPARSE_PIVOT_EPSILON: &str = "STEPWISE_SPARSE_PIVOT_EPSILON";
    pub const ELIMINATION_TOLERANCE: &str = "STEPWISE_ELIMINATION_TOLERANCE";
    pub const SYMMETRY_TOLERANCE: &str = "STEPWISE_SYMMETRY_TOLERANCE";
}

/// Numeric thresholds used by the engines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dense LDLt: a diagonal below this is replaced by a unit column in L
    pub pivot_epsilon: f64,
    /// Sparse LDLt: dividing by a diagonal below this is an error
    pub sparse_pivot_epsilon: f64,
    /// RREF / null space: entries below this count as zero
    pub elimination_tolerance: f64,
    /// Relative tolerance for the A = Aᵗ check
    pub symmetry_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pivot_epsilon: f64::EPSILON,
            sparse_pivot_epsilon: f64::EPSILON,
            elimination_tolerance: 1e-12,
            symmetry_tolerance: 1e-9,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by any `STEPWISE_*` variables that are set
    pub fn from_env() -> Result<Self, StepwiseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StepwiseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let fields: [(&str, &mut f64); 4] = [
            (env_keys::PIVOT_EPSILON, &mut config.pivot_epsilon),
            (env_keys::SPARSE_PIVOT_EPSILON, &mut config.sparse_pivot_epsilon),
            (env_keys::ELIMINATION_TOLERANCE, &mut config.elimination_tolerance),
            (env_keys::SYMMETRY_TOLERANCE, &mut config.symmetry_tolerance),
        ];
        for (key, slot) in fields {
            if let Some(raw) = lookup(key) {
                *slot = parse_threshold(key, &raw)?;
            }
        }
        Ok(config)
    }

    /// Apply a partial JSON object of overrides (unknown keys are rejected)
    pub fn with_overrides(&self, overrides: &JsonValue) -> Result<Self, StepwiseError> {
        let patch = match overrides {
            JsonValue::Null => return Ok(*self),
            JsonValue::Object(map) => map,
            other => {
                return Err(StepwiseError::parse_error(format!(
                    "config must be an object, got {}", other
                )))
            }
        };

        let mut merged = match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => return Err(StepwiseError::internal("config did not serialize to an object")),
        };
        for (key, value) in patch {
            if !merged.contains_key(key) {
                return Err(StepwiseError::parse_error(format!("unknown config field '{}'", key)));
            }
            merged.insert(key.clone(), value.clone());
        }

        let config: Self = serde_json::from_value(JsonValue::Object(merged))
            .map_err(|e| StepwiseError::parse_error(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StepwiseError> {
        let fields = [
            ("pivot_epsilon", self.pivot_epsilon),
            ("sparse_pivot_epsilon", self.sparse_pivot_epsilon),
            ("elimination_tolerance", self.elimination_tolerance),
            ("symmetry_tolerance", self.symmetry_tolerance),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(StepwiseError::domain_error(format!(
                    "{} must be a finite non-negative number, got {}", name, value
                )));
            }
        }
        Ok(())
    }
}

fn parse_threshold(key: &str, raw: &str) -> Result<f64, StepwiseError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(StepwiseError::parse_error(format!(
            "{} must be a finite non-negative number, got '{}'", key, raw
        ))),
    }
}
