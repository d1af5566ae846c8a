//! Backend modules
//!
//! A module is the unit the registry hands out: one instance per backend
//! type, answering which capability interfaces it implements.

use crate::core::{BackendMetaData, ExecutionContext, TableMetaData};

use super::capability::{
    AggregateInterface, CapabilityKind, CapabilitySet, CountInterface, DeleteInterface,
    GetInterface, InsertInterface, QueryInterface, StorageInterface, UpdateInterface,
};
use super::errors::BackendResult;
use super::transaction::{NoOpTransaction, Transaction};

pub trait BackendModule: Send + Sync {
    /// Backend type name, e.g. "memory"
    fn name(&self) -> &str;

    fn query(&self) -> Option<&dyn QueryInterface> {
        None
    }

    fn count(&self) -> Option<&dyn CountInterface> {
        None
    }

    fn get(&self) -> Option<&dyn GetInterface> {
        None
    }

    fn insert(&self) -> Option<&dyn InsertInterface> {
        None
    }

    fn update(&self) -> Option<&dyn UpdateInterface> {
        None
    }

    fn delete(&self) -> Option<&dyn DeleteInterface> {
        None
    }

    fn aggregate(&self) -> Option<&dyn AggregateInterface> {
        None
    }

    fn storage(&self) -> Option<&dyn StorageInterface> {
        None
    }

    /// Capabilities this module implements
    fn capabilities(&self) -> CapabilitySet {
        CapabilityKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    fn supports(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Query => self.query().is_some(),
            CapabilityKind::Count => self.count().is_some(),
            CapabilityKind::Get => self.get().is_some(),
            CapabilityKind::Insert => self.insert().is_some(),
            CapabilityKind::Update => self.update().is_some(),
            CapabilityKind::Delete => self.delete().is_some(),
            CapabilityKind::Aggregate => self.aggregate().is_some(),
            CapabilityKind::Storage => self.storage().is_some(),
        }
    }

    /// Reject tables this module cannot serve before any transaction opens
    fn validate_metadata(
        &self,
        _backend: &BackendMetaData,
        _table: &TableMetaData,
    ) -> BackendResult<()> {
        Ok(())
    }

    /// Open the transaction one action runs in
    fn open_transaction(
        &self,
        _ctx: &ExecutionContext,
        _table: &TableMetaData,
        _backend: &BackendMetaData,
    ) -> BackendResult<Box<dyn Transaction>> {
        Ok(Box::new(NoOpTransaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::action::{ActionContext, CountInput, CountOutput};

    struct CountOnly;

    impl CountInterface for CountOnly {
        fn execute(
            &self,
            _ctx: &mut ActionContext<'_>,
            _input: CountInput,
        ) -> BackendResult<CountOutput> {
            Ok(CountOutput { count: 0 })
        }
    }

    impl BackendModule for CountOnly {
        fn name(&self) -> &str {
            "count-only"
        }

        fn count(&self) -> Option<&dyn CountInterface> {
            Some(self)
        }
    }

    #[test]
    fn test_capabilities_follow_getters() {
        let module = CountOnly;
        let caps = module.capabilities();
        assert_eq!(caps.len(), 1);
        assert!(caps.contains(&CapabilityKind::Count));
        assert!(!module.supports(CapabilityKind::Query));
    }
}
