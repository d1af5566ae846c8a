//! Enumeration backend
//!
//! Read-only tables derived from fixed value lists (status codes, states,
//! and the like). Each table name maps to one [`EnumSource`] in the shared
//! [`EnumerationCatalog`]; rows are `{id, label}`.
//!
//! Implements Query, Count and Get only. Every other action fails with
//! `CapabilityNotImplemented`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{
    find_by_key, find_unique, ActionContext, BackendError, BackendModule,
    BackendModuleDescriptor, BackendResult, CountInput, CountInterface, CountOutput, GetInput,
    GetInterface, GetKey, GetOutput, QueryInput, QueryInterface, QueryOutput,
};
use crate::config::EvaluatorConfig;
use crate::core::{BackendMetaData, Record, TableMetaData, Value};
use crate::filter::FilterEvaluator;

/// Registry key of the enumeration backend
pub const ENUM_BACKEND_TYPE: &str = "enum";

/// Backend detail key naming the source a record came from
pub const SOURCE_DETAIL: &str = "enum_source";

/// One enumerated value
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub id: Value,
    pub label: String,
}

impl EnumValue {
    pub fn new(id: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSource {
    pub name: String,
    pub values: Vec<EnumValue>,
}

impl EnumSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, id: impl Into<Value>, label: impl Into<String>) -> Self {
        self.values.push(EnumValue::new(id, label));
        self
    }

    /// Fields are "id" and "label", in declaration order
    pub fn records(&self) -> Vec<Record> {
        self.values
            .iter()
            .map(|v| {
                Record::new()
                    .with("id", v.id.clone())
                    .with("label", v.label.as_str())
                    .with_detail(SOURCE_DETAIL, self.name.as_str())
            })
            .collect()
    }
}

/// Named enumeration sources shared by every resolved module
#[derive(Debug, Default)]
pub struct EnumerationCatalog {
    sources: RwLock<HashMap<String, EnumSource>>,
}

impl EnumerationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, source: EnumSource) -> Self {
        self.add(source);
        self
    }

    /// Add or replace a source
    pub fn add(&self, source: EnumSource) {
        self.sources.write().insert(source.name.clone(), source);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.read().contains_key(name)
    }

    pub fn records(&self, name: &str) -> Option<Vec<Record>> {
        self.sources.read().get(name).map(EnumSource::records)
    }
}

pub struct EnumerationBackendModule {
    catalog: Arc<EnumerationCatalog>,
    evaluator: FilterEvaluator,
}

impl EnumerationBackendModule {
    pub fn new(catalog: Arc<EnumerationCatalog>, config: EvaluatorConfig) -> Self {
        Self {
            catalog,
            evaluator: FilterEvaluator::new(config),
        }
    }

    pub fn descriptor(
        catalog: Arc<EnumerationCatalog>,
        config: EvaluatorConfig,
    ) -> BackendModuleDescriptor {
        BackendModuleDescriptor::new(ENUM_BACKEND_TYPE, move || {
            Box::new(EnumerationBackendModule::new(catalog.clone(), config.clone()))
        })
    }

    fn records(&self, table: &TableMetaData) -> BackendResult<Vec<Record>> {
        self.catalog
            .records(&table.name)
            .ok_or_else(|| BackendError::NotFound(format!("enumeration source '{}'", table.name)))
    }
}

impl QueryInterface for EnumerationBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: QueryInput,
    ) -> BackendResult<QueryOutput> {
        let records = self.records(ctx.table)?;
        let records = self.evaluator.filter(records, input.filter.as_ref())?;
        Ok(QueryOutput { records })
    }
}

impl CountInterface for EnumerationBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: CountInput,
    ) -> BackendResult<CountOutput> {
        let records = self.records(ctx.table)?;
        let count = self.evaluator.count(records.iter(), input.filter.as_ref())?;
        Ok(CountOutput { count })
    }
}

impl GetInterface for EnumerationBackendModule {
    fn execute(&self, ctx: &mut ActionContext<'_>, input: GetInput) -> BackendResult<GetOutput> {
        let records = self.records(ctx.table)?;
        let record = match input.key {
            GetKey::PrimaryKey(key) => find_by_key(records, "id", &key),
            GetKey::UniqueKey(pairs) => find_unique(records, &ctx.table.name, &pairs)?,
        };
        Ok(GetOutput { record })
    }
}

impl BackendModule for EnumerationBackendModule {
    fn name(&self) -> &str {
        ENUM_BACKEND_TYPE
    }

    fn query(&self) -> Option<&dyn QueryInterface> {
        Some(self)
    }

    fn count(&self) -> Option<&dyn CountInterface> {
        Some(self)
    }

    fn get(&self) -> Option<&dyn GetInterface> {
        Some(self)
    }

    fn validate_metadata(
        &self,
        _backend: &BackendMetaData,
        table: &TableMetaData,
    ) -> BackendResult<()> {
        if !self.catalog.contains(&table.name) {
            return Err(BackendError::invalid_input(format!(
                "no enumeration source for table '{}'",
                table.name
            )));
        }
        Ok(())
    }
}
