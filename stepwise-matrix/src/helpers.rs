//! Helpers for pulling engine inputs out of JSON tool arguments

use serde_json::Value as JsonValue;
use stepwise_core::{EngineConfig, StepwiseError};
use crate::operation::{OperationKind, Request};
use crate::types::Matrix;

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Extract a list of numbers
pub fn extract_number_list(value: &JsonValue, arg: &str) -> Result<Vec<f64>, StepwiseError> {
    let items = value.as_array().ok_or_else(|| {
        StepwiseError::parse_error(format!("{} must be an array, got {}", arg, json_type_name(value)))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64().ok_or_else(|| {
                StepwiseError::parse_error(format!("{}[{}] must be a number, got {}", arg, i, json_type_name(item)))
            })
        })
        .collect()
}

/// Extract a matrix from a nested list of rows
pub fn extract_matrix(value: &JsonValue, arg: &str) -> Result<Matrix, StepwiseError> {
    let rows = value.as_array().ok_or_else(|| {
        StepwiseError::parse_error(format!("{} must be a list of rows, got {}", arg, json_type_name(value)))
    })?;

    let data = rows
        .iter()
        .enumerate()
        .map(|(i, row)| extract_number_list(row, &format!("{}[{}]", arg, i)))
        .collect::<Result<Vec<_>, _>>()?;

    Matrix::from_rows(data)
}

/// Extract a basis given as a list of vectors; each becomes one column
pub fn extract_basis(value: &JsonValue, arg: &str) -> Result<Matrix, StepwiseError> {
    extract_matrix(value, arg).map(|vectors| vectors.transpose())
}

/// Build a request from either matrix text or a list of rows
pub fn extract_request(
    kind: OperationKind,
    value: &JsonValue,
    config: &EngineConfig,
) -> Result<Request, StepwiseError> {
    match value {
        JsonValue::String(text) => Request::from_text(kind, text, config),
        JsonValue::Array(_) => Request::from_dense(kind, extract_matrix(value, "matrix")?, config),
        other => Err(StepwiseError::parse_error(format!(
            "matrix must be text or a list of rows, got {}",
            json_type_name(other)
        ))),
    }
}
