//! Structured engine errors
//!
//! Errors are plain values: one engine invocation either returns its result
//! or one of these, carrying a machine-readable code, a message, and enough
//! context for the caller to tell the user what to change.

use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const INVALID_SHAPE: &str = "INVALID_SHAPE";
    pub const NOT_SQUARE: &str = "NOT_SQUARE";
    pub const NOT_SYMMETRIC: &str = "NOT_SYMMETRIC";
    pub const NEGLIGIBLE_PIVOT: &str = "NEGLIGIBLE_PIVOT";
    pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The invocation failed; the input can be fixed and resubmitted
    Error,
    /// An engine invariant was broken
    Fatal,
}

/// Where in the computation an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation that was running (e.g. "LU", "Sparse-LDLt")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Matrix row involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,

    /// Matrix column involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error returned by every engine entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepwiseError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    /// Severity level
    pub severity: Severity,
}

impl StepwiseError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set operation context
    pub fn in_operation(mut self, operation: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.operation = Some(operation.into());
        self
    }

    /// Builder: set the matrix position the error refers to
    pub fn at(mut self, row: usize, column: usize) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.row = Some(row);
        ctx.column = Some(column);
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    // ========== Common Error Constructors ==========

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
            .with_suggestion("Use [a,b;c,d] for dense or [[row,col,value],...] for sparse input")
    }

    pub fn invalid_shape(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_SHAPE, format!("Invalid matrix shape: {}", details.into()))
            .with_suggestion("Every row must have the same number of columns")
    }

    pub fn not_square(rows: usize, cols: usize) -> Self {
        Self::new(codes::NOT_SQUARE, format!("Expected a square matrix, got {}×{}", rows, cols))
    }

    pub fn not_symmetric(row: usize, col: usize) -> Self {
        Self::new(codes::NOT_SYMMETRIC,
            format!("Matrix is not symmetric: entry ({}, {}) differs from ({}, {})", row, col, col, row))
            .with_suggestion("LDLt needs A = Aᵗ; use LU or PLU for general matrices")
            .at(row, col)
    }

    pub fn negligible_pivot(row: usize, column: usize, value: f64) -> Self {
        Self::new(codes::NEGLIGIBLE_PIVOT,
            format!("Diagonal of row {} is {:e}, too small to divide column {} by", row, value, column))
            .with_suggestion("The matrix is singular or needs pivoting; try the dense LDLt or PLU")
            .at(row, column)
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(codes::UNKNOWN_OPERATION, format!("Unknown operation: {}", name))
            .with_suggestion("Use one of LU, PLU, LDLt, Sparse-LDLt, RREF, Nullspace")
    }

    pub fn domain_error(details: impl Into<String>) -> Self {
        Self::new(codes::DOMAIN_ERROR, format!("Domain error: {}", details.into()))
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for StepwiseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for StepwiseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_fill_context() {
        let err = StepwiseError::negligible_pivot(2, 4, 1e-20).in_operation("Sparse-LDLt");
        let ctx = err.context.unwrap();
        assert_eq!(err.code, codes::NEGLIGIBLE_PIVOT);
        assert_eq!(ctx.row, Some(2));
        assert_eq!(ctx.column, Some(4));
        assert_eq!(ctx.operation.as_deref(), Some("Sparse-LDLt"));
    }

    #[test]
    fn test_notes_accumulate_in_order() {
        let err = StepwiseError::not_symmetric(0, 1)
            .with_note("first")
            .with_note("second");
        let ctx = err.context.unwrap();
        assert_eq!(ctx.row, Some(0));
        assert_eq!(ctx.notes, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_display_includes_code_and_suggestion() {
        let err = StepwiseError::not_square(2, 3);
        assert_eq!(err.to_string(), "[NOT_SQUARE] Expected a square matrix, got 2×3");

        let err = StepwiseError::unknown_operation("QR");
        let text = err.to_string();
        assert!(text.starts_with("[UNKNOWN_OPERATION] Unknown operation: QR"));
        assert!(text.contains("suggestion"));
    }

    #[test]
    fn test_internal_is_fatal() {
        assert_eq!(StepwiseError::internal("oops").severity, Severity::Fatal);
        assert_eq!(StepwiseError::parse_error("x").severity, Severity::Error);
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let json = serde_json::to_value(StepwiseError::new("X", "msg")).unwrap();
        assert_eq!(json["code"], "X");
        assert_eq!(json["severity"], "error");
        assert!(json.get("suggestion").is_none());
        assert!(json.get("context").is_none());
    }
}
