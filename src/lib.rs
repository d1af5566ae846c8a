//! backplane - pluggable backend action dispatch and record filtering
//!
//! A storage-agnostic action (Query, Count, Get, Insert, Update, Delete,
//! Aggregate, Storage) is routed at runtime to the backend module
//! configured for its table. Backends implement any subset of capabilities;
//! those that cannot filter, sort or paginate natively use the shared
//! [`filter::FilterEvaluator`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use backplane::backend::{ActionDispatcher, BackendRegistry, QueryInput};
//! use backplane::core::{BackendMetaData, ExecutionContext, Instance, TableMetaData};
//!
//! let registry = Arc::new(BackendRegistry::with_builtin_backends(store, catalog, config));
//! let dispatcher = ActionDispatcher::new(registry);
//! let instance = Instance::new()
//!     .with_backend(BackendMetaData::new("main", "memory"))
//!     .with_table(TableMetaData::new("person", "main"));
//! let ctx = ExecutionContext::anonymous(Arc::new(instance));
//! let people = dispatcher.query(&ctx, QueryInput::new("person"))?;
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod enumeration;
pub mod filter;
pub mod memory;
pub mod observability;
pub mod runtime;
