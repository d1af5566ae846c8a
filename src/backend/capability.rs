//! Capability interfaces
//!
//! One single-method trait per action. A backend module implements only the
//! ones it supports and reports the rest as absent; the dispatcher turns an
//! absent capability into `CapabilityNotImplemented`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::action::{
    ActionContext, AggregateInput, AggregateOutput, CountInput, CountOutput, DeleteInput,
    DeleteOutput, GetInput, GetOutput, InsertInput, InsertOutput, QueryInput, QueryOutput,
    StorageInput, StorageOutput, UpdateInput, UpdateOutput,
};
use super::errors::BackendResult;

/// The action kinds a backend may support
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CapabilityKind {
    Query,
    Count,
    Get,
    Insert,
    Update,
    Delete,
    Aggregate,
    Storage,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 8] = [
        CapabilityKind::Query,
        CapabilityKind::Count,
        CapabilityKind::Get,
        CapabilityKind::Insert,
        CapabilityKind::Update,
        CapabilityKind::Delete,
        CapabilityKind::Aggregate,
        CapabilityKind::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Query => "Query",
            CapabilityKind::Count => "Count",
            CapabilityKind::Get => "Get",
            CapabilityKind::Insert => "Insert",
            CapabilityKind::Update => "Update",
            CapabilityKind::Delete => "Delete",
            CapabilityKind::Aggregate => "Aggregate",
            CapabilityKind::Storage => "Storage",
        }
    }

    /// True for actions that change stored data
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CapabilityKind::Insert
                | CapabilityKind::Update
                | CapabilityKind::Delete
                | CapabilityKind::Storage
        )
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of supported capabilities
pub type CapabilitySet = BTreeSet<CapabilityKind>;

pub trait QueryInterface: Send + Sync {
    fn execute(&self, ctx: &mut ActionContext<'_>, input: QueryInput)
        -> BackendResult<QueryOutput>;
}

pub trait CountInterface: Send + Sync {
    fn execute(&self, ctx: &mut ActionContext<'_>, input: CountInput)
        -> BackendResult<CountOutput>;
}

pub trait GetInterface: Send + Sync {
    fn execute(&self, ctx: &mut ActionContext<'_>, input: GetInput) -> BackendResult<GetOutput>;
}

pub trait InsertInterface: Send + Sync {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: InsertInput,
    ) -> BackendResult<InsertOutput>;
}

pub trait UpdateInterface: Send + Sync {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: UpdateInput,
    ) -> BackendResult<UpdateOutput>;
}

pub trait DeleteInterface: Send + Sync {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: DeleteInput,
    ) -> BackendResult<DeleteOutput>;
}

pub trait AggregateInterface: Send + Sync {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: AggregateInput,
    ) -> BackendResult<AggregateOutput>;
}

/// Raw byte storage addressed by reference (file path, object key, ...)
pub trait StorageInterface: Send + Sync {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: StorageInput,
    ) -> BackendResult<StorageOutput>;
}
