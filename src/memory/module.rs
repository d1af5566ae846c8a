//! The in-memory backend module
//!
//! Supports every capability. Matching, sorting, paging and aggregation go
//! through the shared evaluator over a snapshot of committed records; writes
//! are staged in a [`MemoryTransaction`].

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{
    find_unique, same_key, ActionContext, AggregateInput, AggregateInterface, AggregateOutput,
    BackendError, BackendModule, BackendModuleDescriptor, BackendResult, CountInput,
    CountInterface, CountOutput, DeleteInput, DeleteInterface, DeleteOutput, GetInput,
    GetInterface, GetKey, GetOutput, InsertInput, InsertInterface, InsertOutput, QueryInput,
    QueryInterface, QueryOutput, StorageInput, StorageInterface, StorageOperation, StorageOutput,
    Transaction, UpdateInput, UpdateInterface, UpdateOutput,
};
use crate::config::EvaluatorConfig;
use crate::core::{BackendMetaData, ExecutionContext, TableMetaData, Value};
use crate::filter::{Aggregator, FilterEvaluator};

use super::store::MemoryRecordStore;
use super::transaction::MemoryTransaction;

/// Registry key of the in-memory backend
pub const MEMORY_BACKEND_TYPE: &str = "memory";

/// Backend property selecting generated key type: `sequence` (default) or `uuid`
pub const KEY_GENERATION_PROPERTY: &str = "key_generation";

pub struct MemoryBackendModule {
    store: Arc<MemoryRecordStore>,
    evaluator: FilterEvaluator,
}

impl MemoryBackendModule {
    pub fn new(store: Arc<MemoryRecordStore>, config: EvaluatorConfig) -> Self {
        Self {
            store,
            evaluator: FilterEvaluator::new(config),
        }
    }

    /// Registration entry sharing one store across every resolved module
    pub fn descriptor(
        store: Arc<MemoryRecordStore>,
        config: EvaluatorConfig,
    ) -> BackendModuleDescriptor {
        BackendModuleDescriptor::new(MEMORY_BACKEND_TYPE, move || {
            Box::new(MemoryBackendModule::new(store.clone(), config.clone()))
        })
    }

    pub fn store(&self) -> &Arc<MemoryRecordStore> {
        &self.store
    }
}

fn memory_transaction<'c>(
    ctx: &'c mut ActionContext<'_>,
) -> BackendResult<&'c mut MemoryTransaction> {
    ctx.transaction_as::<MemoryTransaction>()
        .ok_or_else(|| BackendError::transaction("memory backend requires its own transaction"))
}

fn uuid_keys(backend: &BackendMetaData) -> bool {
    backend.property(KEY_GENERATION_PROPERTY) == Some("uuid")
}

impl QueryInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: QueryInput,
    ) -> BackendResult<QueryOutput> {
        let records = self.store.records(&ctx.table.name);
        let records = self.evaluator.filter(records, input.filter.as_ref())?;
        Ok(QueryOutput { records })
    }
}

impl CountInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: CountInput,
    ) -> BackendResult<CountOutput> {
        let records = self.store.records(&ctx.table.name);
        let count = self.evaluator.count(records.iter(), input.filter.as_ref())?;
        Ok(CountOutput { count })
    }
}

impl GetInterface for MemoryBackendModule {
    fn execute(&self, ctx: &mut ActionContext<'_>, input: GetInput) -> BackendResult<GetOutput> {
        let table = &ctx.table.name;
        let record = match input.key {
            GetKey::PrimaryKey(key) => self.store.find(table, &ctx.table.primary_key_field, &key),
            GetKey::UniqueKey(pairs) => find_unique(self.store.records(table), table, &pairs)?,
        };
        Ok(GetOutput { record })
    }
}

impl InsertInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: InsertInput,
    ) -> BackendResult<InsertOutput> {
        let table = ctx.table.name.clone();
        let primary_key = ctx.table.primary_key_field.clone();
        let generate_uuid = uuid_keys(ctx.backend);
        let tx = memory_transaction(ctx)?;

        let mut records = Vec::with_capacity(input.records.len());
        for mut record in input.records {
            if generate_uuid && record.value(&primary_key).is_null() {
                record.set(primary_key.as_str(), Uuid::new_v4().to_string());
            }
            records.push(tx.stage_insert(&table, &primary_key, record)?);
        }
        Ok(InsertOutput { records })
    }
}

impl UpdateInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: UpdateInput,
    ) -> BackendResult<UpdateOutput> {
        let table = ctx.table.name.clone();
        let primary_key = ctx.table.primary_key_field.clone();
        let tx = memory_transaction(ctx)?;

        let mut records = Vec::with_capacity(input.records.len());
        for changes in input.records {
            records.push(tx.stage_update(&table, &primary_key, changes)?);
        }
        Ok(UpdateOutput { records })
    }
}

impl DeleteInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: DeleteInput,
    ) -> BackendResult<DeleteOutput> {
        if input.primary_keys.is_empty() && input.filter.is_none() {
            return Err(BackendError::invalid_input(
                "delete requires primary keys or a filter",
            ));
        }

        let table = ctx.table.name.clone();
        let primary_key = ctx.table.primary_key_field.clone();
        let existing = self.store.records(&table);

        let mut doomed: Vec<Value> = Vec::new();
        let mut mark = |key: &Value| {
            if !doomed.iter().any(|d| same_key(d, key)) {
                doomed.push(key.clone());
            }
        };

        for key in &input.primary_keys {
            if existing.iter().any(|r| same_key(r.value(&primary_key), key)) {
                mark(key);
            }
        }
        if let Some(filter) = &input.filter {
            let matched = self.evaluator.filter_by(existing, &filter.clauses_only())?;
            for record in &matched {
                mark(record.value(&primary_key));
            }
        }

        let tx = memory_transaction(ctx)?;
        let deleted_count = doomed.len();
        for key in doomed {
            tx.stage_delete(&table, &primary_key, key)?;
        }
        Ok(DeleteOutput { deleted_count })
    }
}

impl AggregateInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: AggregateInput,
    ) -> BackendResult<AggregateOutput> {
        let records = self.store.records(&ctx.table.name);
        let results = Aggregator::new(&self.evaluator).aggregate(
            records,
            input.filter.as_ref(),
            &input.group_by,
            &input.aggregates,
        )?;
        Ok(AggregateOutput { results })
    }
}

impl StorageInterface for MemoryBackendModule {
    fn execute(
        &self,
        ctx: &mut ActionContext<'_>,
        input: StorageInput,
    ) -> BackendResult<StorageOutput> {
        if input.reference.is_empty() {
            return Err(BackendError::invalid_input("storage reference is empty"));
        }

        let table = ctx.table.name.clone();
        let bytes = match input.operation {
            StorageOperation::Write(bytes) => {
                memory_transaction(ctx)?.stage_put_blob(&table, &input.reference, bytes)?;
                None
            }
            StorageOperation::Read => self.store.read_blob(&table, &input.reference),
            StorageOperation::Delete => {
                memory_transaction(ctx)?.stage_delete_blob(&table, &input.reference)?;
                None
            }
        };
        Ok(StorageOutput {
            reference: input.reference,
            bytes,
        })
    }
}

impl BackendModule for MemoryBackendModule {
    fn name(&self) -> &str {
        MEMORY_BACKEND_TYPE
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

    fn insert(&self) -> Option<&dyn InsertInterface> {
        Some(self)
    }

    fn update(&self) -> Option<&dyn UpdateInterface> {
        Some(self)
    }

    fn delete(&self) -> Option<&dyn DeleteInterface> {
        Some(self)
    }

    fn aggregate(&self) -> Option<&dyn AggregateInterface> {
        Some(self)
    }

    fn storage(&self) -> Option<&dyn StorageInterface> {
        Some(self)
    }

    fn validate_metadata(
        &self,
        _backend: &BackendMetaData,
        table: &TableMetaData,
    ) -> BackendResult<()> {
        if table.primary_key_field.is_empty() {
            return Err(BackendError::invalid_input(format!(
                "table '{}' has no primary key field",
                table.name
            )));
        }
        Ok(())
    }

    fn open_transaction(
        &self,
        _ctx: &ExecutionContext,
        _table: &TableMetaData,
        _backend: &BackendMetaData,
    ) -> BackendResult<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction::new(self.store.clone())))
    }
}
