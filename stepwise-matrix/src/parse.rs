//! Text input formats
//!
//! - Dense, Octave style: `[1,2;3,4]`
//! - Sparse symmetric triples: `[[0,0,4],[0,1,2],[1,1,5]]`
//!
//! Text that opens with `[[` is sparse, text that opens with `[` is dense.

use std::collections::BTreeMap;
use thiserror::Error;
use stepwise_core::StepwiseError;
use crate::sparse::SparseSymmetricMatrix;
use crate::types::Matrix;

const DENSE_ROW_DELIM: char = ';';
const DENSE_COL_DELIM: char = ',';
const SPARSE_VALUE_DELIM: char = ',';

/// Largest dimension sparse text may declare through its indices
pub const MAX_SPARSE_DIMENSION: usize = 1024;

/// Parser failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("input is empty")]
    Empty,

    #[error("unrecognized matrix format, expected '[' (dense) or '[[' (sparse)")]
    UnrecognizedFormat,

    #[error("invalid number '{text}' at row {row}, column {col}")]
    InvalidNumber { text: String, row: usize, col: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    Ragged { row: usize, found: usize, expected: usize },

    #[error("entry {entry} needs [row,col,value], found {found} values")]
    TripleArity { entry: usize, found: usize },

    #[error("invalid index '{text}' in entry {entry}")]
    InvalidIndex { text: String, entry: usize },

    #[error("invalid value '{text}' in entry {entry}")]
    InvalidValue { text: String, entry: usize },

    #[error("entry ({row}, {col}) given twice")]
    Duplicate { row: usize, col: usize },

    #[error("index {index} in entry {entry} exceeds the largest supported dimension {max}")]
    TooLarge { index: usize, entry: usize, max: usize },
}

impl From<ParseError> for StepwiseError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Ragged { .. } => StepwiseError::invalid_shape(err.to_string()),
            ParseError::TooLarge { max, .. } => StepwiseError::invalid_shape(err.to_string())
                .with_suggestion(format!("Sparse indices must be below {}", max)),
            _ => StepwiseError::parse_error(err.to_string()),
        }
    }
}

/// Which text format a string is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    Dense,
    Sparse,
}

/// A parsed matrix in whichever representation its text used
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMatrix {
    Dense(Matrix),
    Sparse(SparseSymmetricMatrix),
}

/// Identify the format from the leading brackets, ignoring whitespace
pub fn detect_format(text: &str) -> Result<MatrixFormat, ParseError> {
    let mut chars = text.chars().filter(|c| !c.is_whitespace());
    match (chars.next(), chars.next()) {
        (None, _) => Err(ParseError::Empty),
        (Some('['), Some('[')) => Ok(MatrixFormat::Sparse),
        (Some('['), _) => Ok(MatrixFormat::Dense),
        _ => Err(ParseError::UnrecognizedFormat),
    }
}

/// Parse either format
pub fn parse_any(text: &str) -> Result<ParsedMatrix, StepwiseError> {
    match detect_format(text)? {
        MatrixFormat::Dense => parse_dense(text).map(ParsedMatrix::Dense),
        MatrixFormat::Sparse => parse_sparse(text).map(ParsedMatrix::Sparse),
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `[a,b;c,d]`.
///
/// Brackets and whitespace are ignored, so `[1, 2; 3, 4]` and `1,2;3,4`
/// read the same. A trailing `;` is allowed.
pub fn parse_dense(text: &str) -> Result<Matrix, StepwiseError> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '[' && *c != ']')
        .collect();
    if cleaned.is_empty() {
        return Err(ParseError::Empty.into());
    }

    let mut lines: Vec<&str> = cleaned.split(DENSE_ROW_DELIM).collect();
    if lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(lines.len());
    for (row, line) in lines.iter().enumerate() {
        let values = line
            .split(DENSE_COL_DELIM)
            .enumerate()
            .map(|(col, cell)| {
                parse_finite(cell).ok_or_else(|| ParseError::InvalidNumber {
                    text: cell.to_string(),
                    row,
                    col,
                })
            })
            .collect::<Result<Vec<f64>, ParseError>>()?;

        if let Some(first) = rows.first() {
            if values.len() != first.len() {
                return Err(ParseError::Ragged { row, found: values.len(), expected: first.len() }.into());
            }
        }
        rows.push(values);
    }

    Matrix::from_rows(rows)
}

/// Parse `[[row,col,value],...]` into skyline storage.
///
/// Triples below the diagonal (row > col) are dropped since the upper
/// triangle already defines them. The size is one more than the largest
/// index seen; unlisted diagonals are 0 and gaps inside a column's profile
/// are stored as explicit zeros. Indices at or beyond
/// [`MAX_SPARSE_DIMENSION`] are rejected before anything is allocated.
pub fn parse_sparse(text: &str) -> Result<SparseSymmetricMatrix, StepwiseError> {
    let pieces = text
        .split(['[', ']'])
        .map(|p| p.trim_matches(|c: char| c.is_whitespace() || c == SPARSE_VALUE_DELIM))
        .filter(|p| !p.is_empty());

    // keyed by (col, row) so each column's entries are adjacent
    let mut entries: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut max_index: Option<usize> = None;

    for (entry, piece) in pieces.enumerate() {
        let parts: Vec<&str> = piece.split(SPARSE_VALUE_DELIM).map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ParseError::TripleArity { entry, found: parts.len() }.into());
        }

        let index = |text: &str| {
            text.parse::<usize>().map_err(|_| ParseError::InvalidIndex { text: text.to_string(), entry })
        };
        let row = index(parts[0])?;
        let col = index(parts[1])?;
        let value = parse_finite(parts[2])
            .ok_or_else(|| ParseError::InvalidValue { text: parts[2].to_string(), entry })?;
        let largest = row.max(col);
        if largest >= MAX_SPARSE_DIMENSION {
            return Err(ParseError::TooLarge { index: largest, entry, max: MAX_SPARSE_DIMENSION }.into());
        }

        max_index = Some(max_index.map_or(largest, |seen| seen.max(largest)));
        if row > col {
            continue;
        }
        if entries.insert((col, row), value).is_some() {
            return Err(ParseError::Duplicate { row, col }.into());
        }
    }

    let Some(n) = max_index.and_then(|seen| seen.checked_add(1)) else {
        return Err(ParseError::Empty.into());
    };

    let mut data = Vec::with_capacity(entries.len() + n);
    let mut diagonal_indices = Vec::with_capacity(n);
    for col in 0..n {
        let mut column = entries.range((col, 0)..=(col, col));
        let skyline = column.next().map_or(col, |(&(_, row), _)| row);

        diagonal_indices.push(data.len());
        for row in (skyline..=col).rev() {
            data.push(entries.get(&(col, row)).copied().unwrap_or(0.0));
        }
    }

    SparseSymmetricMatrix::from_parts(data, diagonal_indices)
}
