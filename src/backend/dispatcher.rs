//! # Action Dispatcher
//!
//! Routes one action to the backend module configured for its table.
//!
//! # Dispatch Flow (strict order)
//!
//! 1. Resolve table and backend metadata from the instance
//! 2. Resolve the module for the backend type
//! 3. Bind the capability (or fail with `CapabilityNotImplemented`)
//! 4. Validate the filter expression
//! 5. Open the transaction
//! 6. Execute
//! 7. Commit on success, roll back on error; close either way
//!    (a close failure is reported only after a successful commit)
//!
//! Steps 1-4 never open a transaction.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{BackendMetaData, ExecutionContext, TableMetaData};
use crate::observability::{DispatchMetrics, Event};

use super::action::{
    ActionContext, ActionInput, ActionOutput, AggregateInput, AggregateOutput, CountInput,
    CountOutput, DeleteInput, DeleteOutput, GetInput, GetOutput, InsertInput, InsertOutput,
    QueryInput, QueryOutput, StorageInput, StorageOutput, UpdateInput, UpdateOutput,
};
use super::capability::{
    AggregateInterface, CapabilityKind, CountInterface, DeleteInterface, GetInterface,
    InsertInterface, QueryInterface, StorageInterface, UpdateInterface,
};
use super::errors::{BackendError, BackendResult, DispatchError, DispatchResult};
use super::module::BackendModule;
use super::registry::BackendRegistry;
use super::transaction::ScopedTransaction;

/// Capability interface bound for one dispatch
enum Bound<'m> {
    Query(&'m dyn QueryInterface),
    Count(&'m dyn CountInterface),
    Get(&'m dyn GetInterface),
    Insert(&'m dyn InsertInterface),
    Update(&'m dyn UpdateInterface),
    Delete(&'m dyn DeleteInterface),
    Aggregate(&'m dyn AggregateInterface),
    Storage(&'m dyn StorageInterface),
}

impl<'m> Bound<'m> {
    fn bind(module: &'m dyn BackendModule, kind: CapabilityKind) -> Option<Self> {
        match kind {
            CapabilityKind::Query => module.query().map(Bound::Query),
            CapabilityKind::Count => module.count().map(Bound::Count),
            CapabilityKind::Get => module.get().map(Bound::Get),
            CapabilityKind::Insert => module.insert().map(Bound::Insert),
            CapabilityKind::Update => module.update().map(Bound::Update),
            CapabilityKind::Delete => module.delete().map(Bound::Delete),
            CapabilityKind::Aggregate => module.aggregate().map(Bound::Aggregate),
            CapabilityKind::Storage => module.storage().map(Bound::Storage),
        }
    }

    fn execute(
        self,
        ctx: &mut ActionContext<'_>,
        input: ActionInput,
    ) -> BackendResult<ActionOutput> {
        match (self, input) {
            (Bound::Query(cap), ActionInput::Query(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Query)
            }
            (Bound::Count(cap), ActionInput::Count(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Count)
            }
            (Bound::Get(cap), ActionInput::Get(i)) => cap.execute(ctx, i).map(ActionOutput::Get),
            (Bound::Insert(cap), ActionInput::Insert(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Insert)
            }
            (Bound::Update(cap), ActionInput::Update(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Update)
            }
            (Bound::Delete(cap), ActionInput::Delete(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Delete)
            }
            (Bound::Aggregate(cap), ActionInput::Aggregate(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Aggregate)
            }
            (Bound::Storage(cap), ActionInput::Storage(i)) => {
                cap.execute(ctx, i).map(ActionOutput::Storage)
            }
            (_, input) => Err(BackendError::invalid_input(format!(
                "{} input bound to a different capability",
                input.capability()
            ))),
        }
    }
}

/// Dispatches actions through a shared registry
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    registry: Arc<BackendRegistry>,
    metrics: Arc<DispatchMetrics>,
}

impl ActionDispatcher {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Run one action inside its own transaction
    pub fn dispatch(
        &self,
        ctx: &ExecutionContext,
        input: ActionInput,
    ) -> DispatchResult<ActionOutput> {
        let capability = input.capability();
        let table = input.table().to_string();
        self.metrics.record_started();

        match self.dispatch_inner(ctx, input) {
            Ok(output) => {
                self.metrics.record_succeeded();
                debug!(
                    target: "backplane::dispatch",
                    event = Event::DispatchComplete.as_str(),
                    table = %table,
                    capability = %capability,
                    "dispatch complete"
                );
                Ok(output)
            }
            Err(e) => {
                self.metrics.record_failed();
                warn!(
                    target: "backplane::dispatch",
                    event = Event::DispatchFailed.as_str(),
                    table = %table,
                    capability = %capability,
                    code = e.code(),
                    error = %e,
                    "dispatch failed"
                );
                Err(e)
            }
        }
    }

    fn dispatch_inner(
        &self,
        ctx: &ExecutionContext,
        input: ActionInput,
    ) -> DispatchResult<ActionOutput> {
        let capability = input.capability();
        let instance = ctx.instance();
        let table = instance
            .table(input.table())
            .ok_or_else(|| DispatchError::UnknownTable(input.table().to_string()))?;
        let backend =
            instance
                .backend(&table.backend_name)
                .ok_or_else(|| DispatchError::UnknownBackend {
                    table: table.name.clone(),
                    backend: table.backend_name.clone(),
                })?;

        debug!(
            target: "backplane::dispatch",
            event = Event::DispatchStart.as_str(),
            table = %table.name,
            backend_type = %backend.backend_type,
            capability = %capability,
            "dispatching action"
        );

        let module = self
            .registry
            .resolve(&backend.backend_type)
            .map_err(|e| e.for_table(&table.name))?;

        let Some(bound) = Bound::bind(module.as_ref(), capability) else {
            self.metrics.record_capability_missing();
            warn!(
                target: "backplane::dispatch",
                event = Event::CapabilityMissing.as_str(),
                table = %table.name,
                backend_type = %backend.backend_type,
                capability = %capability,
                "backend module does not implement capability"
            );
            return Err(DispatchError::CapabilityNotImplemented {
                module: module.name().to_string(),
                capability,
                table: table.name.clone(),
            });
        };

        if let Some(filter) = input.filter() {
            filter
                .validate()
                .map_err(|source| DispatchError::InvalidFilter {
                    table: table.name.clone(),
                    capability,
                    source,
                })?;
        }

        module
            .validate_metadata(backend, table)
            .map_err(|source| execution_error(backend, table, capability, source))?;

        self.run_in_transaction(module.as_ref(), bound, ctx, table, backend, input)
    }

    fn run_in_transaction(
        &self,
        module: &dyn BackendModule,
        bound: Bound<'_>,
        ctx: &ExecutionContext,
        table: &TableMetaData,
        backend: &BackendMetaData,
        input: ActionInput,
    ) -> DispatchResult<ActionOutput> {
        let capability = input.capability();
        let transaction = module
            .open_transaction(ctx, table, backend)
            .map_err(|e| transaction_error(backend, table, "open", &e))?;
        let mut scoped = ScopedTransaction::new(transaction, &backend.backend_type, &table.name);

        let result = {
            let mut action_ctx = ActionContext {
                execution: ctx,
                table,
                backend,
                transaction: scoped.transaction(),
            };
            bound.execute(&mut action_ctx, input)
        };

        match result {
            Ok(output) => {
                if let Err(e) = scoped.commit() {
                    self.rollback(&mut scoped);
                    return Err(transaction_error(backend, table, "commit", &e));
                }
                self.metrics.record_commit();
                scoped
                    .close()
                    .map_err(|e| transaction_error(backend, table, "close", &e))?;
                Ok(output)
            }
            Err(source) => {
                self.rollback(&mut scoped);
                Err(execution_error(backend, table, capability, source))
            }
        }
        // on error paths `scoped` closes at drop, keeping the original error
    }

    fn rollback(&self, scoped: &mut ScopedTransaction) {
        if scoped.rollback() {
            self.metrics.record_rollback();
        } else {
            self.metrics.record_rollback_failure();
        }
    }

    /// Query; returns the matching records
    pub fn query(&self, ctx: &ExecutionContext, input: QueryInput) -> DispatchResult<QueryOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Query(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Query, table)),
        }
    }

    pub fn count(&self, ctx: &ExecutionContext, input: CountInput) -> DispatchResult<CountOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Count(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Count, table)),
        }
    }

    pub fn get(&self, ctx: &ExecutionContext, input: GetInput) -> DispatchResult<GetOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Get(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Get, table)),
        }
    }

    pub fn insert(
        &self,
        ctx: &ExecutionContext,
        input: InsertInput,
    ) -> DispatchResult<InsertOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Insert(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Insert, table)),
        }
    }

    pub fn update(
        &self,
        ctx: &ExecutionContext,
        input: UpdateInput,
    ) -> DispatchResult<UpdateOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Update(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Update, table)),
        }
    }

    pub fn delete(
        &self,
        ctx: &ExecutionContext,
        input: DeleteInput,
    ) -> DispatchResult<DeleteOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Delete(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Delete, table)),
        }
    }

    pub fn aggregate(
        &self,
        ctx: &ExecutionContext,
        input: AggregateInput,
    ) -> DispatchResult<AggregateOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Aggregate(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Aggregate, table)),
        }
    }

    pub fn storage(
        &self,
        ctx: &ExecutionContext,
        input: StorageInput,
    ) -> DispatchResult<StorageOutput> {
        let table = input.table.clone();
        match self.dispatch(ctx, input.into())? {
            ActionOutput::Storage(output) => Ok(output),
            _ => Err(unexpected_output(CapabilityKind::Storage, table)),
        }
    }
}

fn execution_error(
    backend: &BackendMetaData,
    table: &TableMetaData,
    capability: CapabilityKind,
    source: BackendError,
) -> DispatchError {
    DispatchError::BackendExecution {
        backend_type: backend.backend_type.clone(),
        capability,
        table: table.name.clone(),
        source,
    }
}

fn transaction_error(
    backend: &BackendMetaData,
    table: &TableMetaData,
    phase: &'static str,
    error: &BackendError,
) -> DispatchError {
    DispatchError::Transaction {
        backend_type: backend.backend_type.clone(),
        table: table.name.clone(),
        phase,
        message: error.to_string(),
    }
}

fn unexpected_output(capability: CapabilityKind, table: String) -> DispatchError {
    DispatchError::UnexpectedOutput { capability, table }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::registry::BackendModuleDescriptor;
    use crate::backend::transaction::Transaction;
    use crate::core::{Instance, Record};
    use crate::filter::{Criteria, FilterExpression, Operator};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        committed: AtomicUsize,
        rolled_back: AtomicUsize,
        closed: AtomicUsize,
        fail_close: AtomicBool,
    }

    struct CountingTransaction(Arc<Counters>);

    impl Transaction for CountingTransaction {
        fn commit(&mut self) -> BackendResult<()> {
            self.0.committed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rollback(&mut self) -> BackendResult<()> {
            self.0.rolled_back.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) -> BackendResult<()> {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_close.load(Ordering::SeqCst) {
                return Err(BackendError::transaction("close broke"));
            }
            Ok(())
        }
    }

    /// Query-only module that fails when asked for table "broken"
    struct QueryOnly(Arc<Counters>);

    impl QueryInterface for QueryOnly {
        fn execute(
            &self,
            ctx: &mut ActionContext<'_>,
            _input: QueryInput,
        ) -> BackendResult<QueryOutput> {
            if ctx.table.name == "broken" {
                return Err(BackendError::execution("disk on fire"));
            }
            Ok(QueryOutput {
                records: vec![Record::new().with("id", 1)],
            })
        }
    }

    impl BackendModule for QueryOnly {
        fn name(&self) -> &str {
            "query-only"
        }

        fn query(&self) -> Option<&dyn QueryInterface> {
            Some(self)
        }

        fn open_transaction(
            &self,
            _ctx: &ExecutionContext,
            _table: &TableMetaData,
            _backend: &BackendMetaData,
        ) -> BackendResult<Box<dyn Transaction>> {
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingTransaction(self.0.clone())))
        }
    }

    fn setup() -> (ActionDispatcher, ExecutionContext, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let registry = BackendRegistry::new();
        let shared = counters.clone();
        registry.register(BackendModuleDescriptor::new("test", move || {
            Box::new(QueryOnly(shared.clone()))
        }));

        let instance = Instance::new()
            .with_backend(BackendMetaData::new("main", "test"))
            .with_backend(BackendMetaData::new("other", "nope"))
            .with_table(TableMetaData::new("person", "main"))
            .with_table(TableMetaData::new("broken", "main"))
            .with_table(TableMetaData::new("orphan", "other"))
            .with_table(TableMetaData::new("dangling", "missing"));
        let ctx = ExecutionContext::anonymous(Arc::new(instance));
        (ActionDispatcher::new(Arc::new(registry)), ctx, counters)
    }

    #[test]
    fn test_query_commits_and_closes() {
        let (dispatcher, ctx, counters) = setup();
        let output = dispatcher.query(&ctx, QueryInput::new("person")).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.committed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rolled_back.load(Ordering::SeqCst), 0);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.metrics().snapshot().commits, 1);
    }

    #[test]
    fn test_close_failure_after_commit_is_surfaced() {
        let (dispatcher, ctx, counters) = setup();
        counters.fail_close.store(true, Ordering::SeqCst);

        let err = dispatcher.query(&ctx, QueryInput::new("person")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Transaction { phase: "close", .. }
        ));
        assert_eq!(counters.committed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rolled_back.load(Ordering::SeqCst), 0);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backend_error_rolls_back() {
        let (dispatcher, ctx, counters) = setup();
        let err = dispatcher.query(&ctx, QueryInput::new("broken")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::BackendExecution {
                capability: CapabilityKind::Query,
                source: BackendError::Execution(_),
                ..
            }
        ));
        assert_eq!(counters.committed.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rolled_back.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_capability_opens_nothing() {
        let (dispatcher, ctx, counters) = setup();
        let err = dispatcher.count(&ctx, CountInput::new("person")).unwrap_err();
        assert_eq!(err.code(), "CAPABILITY_NOT_IMPLEMENTED");
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.metrics().snapshot().capability_missing, 1);
    }

    #[test]
    fn test_configuration_errors() {
        let (dispatcher, ctx, counters) = setup();
        let err = dispatcher.query(&ctx, QueryInput::new("ghost")).unwrap_err();
        assert_eq!(err, DispatchError::UnknownTable("ghost".into()));

        let err = dispatcher.query(&ctx, QueryInput::new("dangling")).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_BACKEND");

        let err = dispatcher.query(&ctx, QueryInput::new("orphan")).unwrap_err();
        assert_eq!(
            err,
            DispatchError::UnrecognizedBackendType {
                backend_type: "nope".into(),
                table: Some("orphan".into()),
            }
        );
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_filter_rejected_before_transaction() {
        let (dispatcher, ctx, counters) = setup();
        let filter = FilterExpression::new().with_criteria(Criteria::new(
            "age",
            Operator::Between,
            vec![1.into()],
        ));
        let err = dispatcher
            .query(&ctx, QueryInput::new("person").with_filter(filter))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER");
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }
}
