//! Action inputs and outputs
//!
//! Every action targets one table by name. The dispatcher resolves the
//! table's backend from the instance in the `ExecutionContext`.

use serde::{Deserialize, Serialize};

use crate::core::{BackendMetaData, ExecutionContext, Record, TableMetaData, Value};
use crate::filter::{Aggregate, AggregateResult, FilterExpression};

use super::capability::CapabilityKind;
use super::transaction::Transaction;

/// What a capability implementation sees while executing
pub struct ActionContext<'a> {
    pub execution: &'a ExecutionContext,
    pub table: &'a TableMetaData,
    pub backend: &'a BackendMetaData,
    pub transaction: &'a mut dyn Transaction,
}

impl ActionContext<'_> {
    /// Downcast the open transaction to the backend's own type
    pub fn transaction_as<T: Transaction + 'static>(&mut self) -> Option<&mut T> {
        self.transaction
            .as_any_mut()
            .and_then(|any| any.downcast_mut::<T>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInput {
    pub table: String,
    #[serde(default)]
    pub filter: Option<FilterExpression>,
}

impl QueryInput {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryOutput {
    pub records: Vec<Record>,
}

/// Count of records matching the filter's clauses.
///
/// Ordering, skip and limit on the filter are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountInput {
    pub table: String,
    #[serde(default)]
    pub filter: Option<FilterExpression>,
}

impl CountInput {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountOutput {
    pub count: usize,
}

/// How Get addresses a single record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GetKey {
    /// Value of the table's primary key field
    PrimaryKey(Value),
    /// Field/value pairs that together identify one record
    UniqueKey(Vec<(String, Value)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetInput {
    pub table: String,
    pub key: GetKey,
}

impl GetInput {
    pub fn by_primary_key(table: impl Into<String>, key: impl Into<Value>) -> Self {
        Self {
            table: table.into(),
            key: GetKey::PrimaryKey(key.into()),
        }
    }

    pub fn by_unique_key(table: impl Into<String>, key: Vec<(String, Value)>) -> Self {
        Self {
            table: table.into(),
            key: GetKey::UniqueKey(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetOutput {
    pub record: Option<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertInput {
    pub table: String,
    pub records: Vec<Record>,
}

impl InsertInput {
    pub fn new(table: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            table: table.into(),
            records,
        }
    }
}

/// Inserted records as stored, including generated keys
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsertOutput {
    pub records: Vec<Record>,
}

/// Each record carries its primary key plus the fields to change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInput {
    pub table: String,
    pub records: Vec<Record>,
}

impl UpdateInput {
    pub fn new(table: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            table: table.into(),
            records,
        }
    }
}

/// Full records after the update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateOutput {
    pub records: Vec<Record>,
}

/// Delete by primary keys, by filter, or both (union)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteInput {
    pub table: String,
    #[serde(default)]
    pub primary_keys: Vec<Value>,
    #[serde(default)]
    pub filter: Option<FilterExpression>,
}

impl DeleteInput {
    pub fn by_primary_keys(table: impl Into<String>, keys: Vec<Value>) -> Self {
        Self {
            table: table.into(),
            primary_keys: keys,
            filter: None,
        }
    }

    pub fn by_filter(table: impl Into<String>, filter: FilterExpression) -> Self {
        Self {
            table: table.into(),
            primary_keys: Vec::new(),
            filter: Some(filter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteOutput {
    pub deleted_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateInput {
    pub table: String,
    #[serde(default)]
    pub filter: Option<FilterExpression>,
    #[serde(default)]
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
}

impl AggregateInput {
    pub fn new(table: impl Into<String>, aggregates: Vec<Aggregate>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            group_by: Vec::new(),
            aggregates,
        }
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by.push(field.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateOutput {
    pub results: Vec<AggregateResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageOperation {
    Write(Vec<u8>),
    Read,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInput {
    pub table: String,
    /// Backend-relative reference such as a file name or object key
    pub reference: String,
    pub operation: StorageOperation,
}

impl StorageInput {
    pub fn write(table: impl Into<String>, reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            table: table.into(),
            reference: reference.into(),
            operation: StorageOperation::Write(bytes),
        }
    }

    pub fn read(table: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            reference: reference.into(),
            operation: StorageOperation::Read,
        }
    }

    pub fn delete(table: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            reference: reference.into(),
            operation: StorageOperation::Delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageOutput {
    pub reference: String,
    /// Bytes read; `None` for writes, deletes and missing references
    pub bytes: Option<Vec<u8>>,
}

/// Any action, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionInput {
    Query(QueryInput),
    Count(CountInput),
    Get(GetInput),
    Insert(InsertInput),
    Update(UpdateInput),
    Delete(DeleteInput),
    Aggregate(AggregateInput),
    Storage(StorageInput),
}

impl ActionInput {
    pub fn capability(&self) -> CapabilityKind {
        match self {
            ActionInput::Query(_) => CapabilityKind::Query,
            ActionInput::Count(_) => CapabilityKind::Count,
            ActionInput::Get(_) => CapabilityKind::Get,
            ActionInput::Insert(_) => CapabilityKind::Insert,
            ActionInput::Update(_) => CapabilityKind::Update,
            ActionInput::Delete(_) => CapabilityKind::Delete,
            ActionInput::Aggregate(_) => CapabilityKind::Aggregate,
            ActionInput::Storage(_) => CapabilityKind::Storage,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            ActionInput::Query(i) => &i.table,
            ActionInput::Count(i) => &i.table,
            ActionInput::Get(i) => &i.table,
            ActionInput::Insert(i) => &i.table,
            ActionInput::Update(i) => &i.table,
            ActionInput::Delete(i) => &i.table,
            ActionInput::Aggregate(i) => &i.table,
            ActionInput::Storage(i) => &i.table,
        }
    }

    /// The filter expression carried by the action, if any
    pub fn filter(&self) -> Option<&FilterExpression> {
        match self {
            ActionInput::Query(i) => i.filter.as_ref(),
            ActionInput::Count(i) => i.filter.as_ref(),
            ActionInput::Delete(i) => i.filter.as_ref(),
            ActionInput::Aggregate(i) => i.filter.as_ref(),
            _ => None,
        }
    }
}

impl From<QueryInput> for ActionInput {
    fn from(i: QueryInput) -> Self {
        ActionInput::Query(i)
    }
}

impl From<CountInput> for ActionInput {
    fn from(i: CountInput) -> Self {
        ActionInput::Count(i)
    }
}

impl From<GetInput> for ActionInput {
    fn from(i: GetInput) -> Self {
        ActionInput::Get(i)
    }
}

impl From<InsertInput> for ActionInput {
    fn from(i: InsertInput) -> Self {
        ActionInput::Insert(i)
    }
}

impl From<UpdateInput> for ActionInput {
    fn from(i: UpdateInput) -> Self {
        ActionInput::Update(i)
    }
}

impl From<DeleteInput> for ActionInput {
    fn from(i: DeleteInput) -> Self {
        ActionInput::Delete(i)
    }
}

impl From<AggregateInput> for ActionInput {
    fn from(i: AggregateInput) -> Self {
        ActionInput::Aggregate(i)
    }
}

impl From<StorageInput> for ActionInput {
    fn from(i: StorageInput) -> Self {
        ActionInput::Storage(i)
    }
}

/// Any action result, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionOutput {
    Query(QueryOutput),
    Count(CountOutput),
    Get(GetOutput),
    Insert(InsertOutput),
    Update(UpdateOutput),
    Delete(DeleteOutput),
    Aggregate(AggregateOutput),
    Storage(StorageOutput),
}

impl ActionOutput {
    pub fn capability(&self) -> CapabilityKind {
        match self {
            ActionOutput::Query(_) => CapabilityKind::Query,
            ActionOutput::Count(_) => CapabilityKind::Count,
            ActionOutput::Get(_) => CapabilityKind::Get,
            ActionOutput::Insert(_) => CapabilityKind::Insert,
            ActionOutput::Update(_) => CapabilityKind::Update,
            ActionOutput::Delete(_) => CapabilityKind::Delete,
            ActionOutput::Aggregate(_) => CapabilityKind::Aggregate,
            ActionOutput::Storage(_) => CapabilityKind::Storage,
        }
    }
}
