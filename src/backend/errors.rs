//! # Backend and Dispatch Errors
//!
//! Backend implementations return `BackendError`. The dispatcher wraps it
//! into `DispatchError` with the table, backend type and capability, so a
//! caller can diagnose a misconfiguration from the error alone.

use thiserror::Error;

use crate::filter::FilterError;

use super::capability::CapabilityKind;

/// Result type for backend implementations
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type for dispatch
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors raised inside a backend module
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Storage failure: {0}")]
    Execution(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Transaction failure: {0}")]
    Transaction(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BackendError {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Execution(_) => "BACKEND_EXECUTION",
            BackendError::Filter(e) => e.code(),
            BackendError::Transaction(_) => "TRANSACTION",
            BackendError::DuplicateKey(_) => "DUPLICATE_KEY",
            BackendError::NotFound(_) => "NOT_FOUND",
            BackendError::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

/// Errors surfaced to dispatch callers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table '{table}' references unknown backend '{backend}'")]
    UnknownBackend { table: String, backend: String },

    #[error("Unrecognized backend type '{backend_type}'{}", table_suffix(.table))]
    UnrecognizedBackendType {
        backend_type: String,
        table: Option<String>,
    },

    #[error("Backend module '{module}' does not implement {capability} (table '{table}')")]
    CapabilityNotImplemented {
        module: String,
        capability: CapabilityKind,
        table: String,
    },

    #[error("Invalid filter for {capability} on table '{table}': {source}")]
    InvalidFilter {
        table: String,
        capability: CapabilityKind,
        #[source]
        source: FilterError,
    },

    #[error("Transaction {phase} failed on backend '{backend_type}' (table '{table}'): {message}")]
    Transaction {
        backend_type: String,
        table: String,
        phase: &'static str,
        message: String,
    },

    #[error("{capability} on table '{table}' failed in backend '{backend_type}': {source}")]
    BackendExecution {
        backend_type: String,
        capability: CapabilityKind,
        table: String,
        #[source]
        source: BackendError,
    },

    #[error("{capability} on table '{table}' returned an unexpected output kind")]
    UnexpectedOutput {
        capability: CapabilityKind,
        table: String,
    },

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn table_suffix(table: &Option<String>) -> String {
    match table {
        Some(t) => format!(" (table '{}')", t),
        None => String::new(),
    }
}

impl DispatchError {
    pub fn unrecognized_backend_type(backend_type: impl Into<String>) -> Self {
        Self::UnrecognizedBackendType {
            backend_type: backend_type.into(),
            table: None,
        }
    }

    /// Attach the table name to errors raised before the table was known
    pub fn for_table(self, table: &str) -> Self {
        match self {
            Self::UnrecognizedBackendType {
                backend_type,
                table: None,
            } => Self::UnrecognizedBackendType {
                backend_type,
                table: Some(table.to_string()),
            },
            other => other,
        }
    }

    /// Get error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTable(_) => "UNKNOWN_TABLE",
            Self::UnknownBackend { .. } => "UNKNOWN_BACKEND",
            Self::UnrecognizedBackendType { .. } => "UNRECOGNIZED_BACKEND_TYPE",
            Self::CapabilityNotImplemented { .. } => "CAPABILITY_NOT_IMPLEMENTED",
            Self::InvalidFilter { .. } => "INVALID_FILTER",
            Self::Transaction { .. } => "TRANSACTION_ERROR",
            Self::BackendExecution { .. } => "BACKEND_EXECUTION_ERROR",
            Self::UnexpectedOutput { .. } => "UNEXPECTED_OUTPUT",
            Self::WorkerPanicked(_) => "WORKER_PANICKED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors caused by configuration rather than data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownTable(_)
                | Self::UnknownBackend { .. }
                | Self::UnrecognizedBackendType { .. }
                | Self::CapabilityNotImplemented { .. }
        )
    }
}
