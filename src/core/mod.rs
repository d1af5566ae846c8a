//! # Core Types
//!
//! Values, records, configured metadata and the execution context every
//! action runs with.

mod context;
mod metadata;
mod record;
mod value;

pub use context::{ExecutionContext, Session};
pub use metadata::{BackendMetaData, Instance, TableMetaData};
pub use record::{FieldMap, Record};
pub use value::{Value, ValueKind};
