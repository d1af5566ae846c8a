//! # Filter Errors

use thiserror::Error;

use crate::core::ValueKind;

use super::aggregate::AggregateOperator;
use super::criteria::{Arity, Operator};

/// Result type for filter evaluation
pub type FilterResult<T> = Result<T, FilterError>;

/// Malformed or ill-typed filter expressions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Criteria on '{field}' uses {operator} which takes {expected} value(s), got {actual}")]
    InvalidCriteriaArity {
        field: String,
        operator: Operator,
        expected: Arity,
        actual: usize,
    },

    #[error("Cannot order {record} against {criterion} for {operator} on '{field}'")]
    TypeMismatch {
        field: String,
        operator: Operator,
        record: ValueKind,
        criterion: ValueKind,
    },

    #[error("Invalid LIKE pattern on '{field}': {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Cannot apply {operator} to {kind} values of '{field}'")]
    NotNumeric {
        field: String,
        operator: AggregateOperator,
        kind: ValueKind,
    },
}

impl FilterError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::InvalidCriteriaArity { .. } => "INVALID_CRITERIA_ARITY",
            FilterError::TypeMismatch { .. } => "TYPE_MISMATCH",
            FilterError::InvalidPattern { .. } => "INVALID_PATTERN",
            FilterError::NotNumeric { .. } => "NOT_NUMERIC",
        }
    }
}
