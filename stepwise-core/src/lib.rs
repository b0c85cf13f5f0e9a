//! Stepwise Core - Fundamental types
//!
//! This crate provides the types shared by every Stepwise crate:
//! - `StepwiseError`: Structured errors with machine-readable codes
//! - `EngineConfig`: Numeric thresholds threaded through the engines
//! - `tolerance`: Named "is this effectively zero" tests

mod error;
mod config;
pub mod tolerance;

pub use error::{StepwiseError, ErrorContext, Severity, codes};
pub use config::{EngineConfig, env_keys};
