//! Staging transaction for the in-memory store
//!
//! Writes are checked as they are staged, held in order, and applied as one
//! batch on commit. Until then no other dispatch can observe them.

use std::any::Any;
use std::sync::Arc;

use crate::backend::{same_key, BackendError, BackendResult, Transaction};
use crate::core::{Record, Value};

use super::store::{MemoryRecordStore, StagedWrite};

pub struct MemoryTransaction {
    store: Arc<MemoryRecordStore>,
    staged: Vec<StagedWrite>,
    closed: bool,
}

impl MemoryTransaction {
    pub fn new(store: Arc<MemoryRecordStore>) -> Self {
        Self {
            store,
            staged: Vec::new(),
            closed: false,
        }
    }

    pub fn store(&self) -> &MemoryRecordStore {
        &self.store
    }

    /// Staged writes, in order
    pub fn staged(&self) -> &[StagedWrite] {
        &self.staged
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::transaction("transaction already closed"));
        }
        Ok(())
    }

    fn staged_insert(&self, table: &str, primary_key: &str, key: &Value) -> bool {
        self.staged.iter().any(|w| match w {
            StagedWrite::Insert {
                table: t,
                primary_key: pk,
                record,
            } => t == table && pk == primary_key && same_key(record.value(pk), key),
            _ => false,
        })
    }

    /// Stage an insert, generating an integer key when the record has none
    pub fn stage_insert(
        &mut self,
        table: &str,
        primary_key: &str,
        mut record: Record,
    ) -> BackendResult<Record> {
        self.ensure_open()?;
        if record.value(primary_key).is_null() {
            let id = self.store.reserve_id(table)?;
            record.set(primary_key, id);
        }

        let key = record.value(primary_key);
        if self.store.contains_key(table, primary_key, key)
            || self.staged_insert(table, primary_key, key)
        {
            return Err(BackendError::DuplicateKey(format!(
                "{}.{}={}",
                table, primary_key, key
            )));
        }

        self.staged.push(StagedWrite::Insert {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            record: record.clone(),
        });
        Ok(record)
    }

    /// Stage a partial update; returns the record as this transaction sees it.
    ///
    /// Only the changed fields are staged. They are merged into the row as
    /// committed when the batch is applied, so concurrent updates of
    /// different fields on one key all land.
    pub fn stage_update(
        &mut self,
        table: &str,
        primary_key: &str,
        changes: Record,
    ) -> BackendResult<Record> {
        self.ensure_open()?;
        let key = changes.value(primary_key);
        if key.is_null() {
            return Err(BackendError::invalid_input(format!(
                "update on '{}' is missing primary key '{}'",
                table, primary_key
            )));
        }

        let mut current = self
            .pending_version(table, primary_key, key)
            .ok_or_else(|| BackendError::NotFound(format!("{}.{}={}", table, primary_key, key)))?;
        current.merge_from(&changes);

        let key = key.clone();
        self.staged.push(StagedWrite::Update {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            key,
            changes,
        });
        Ok(current)
    }

    /// Committed row of a key with this transaction's staged writes applied
    fn pending_version(&self, table: &str, primary_key: &str, key: &Value) -> Option<Record> {
        let mut current = self.store.find(table, primary_key, key);
        for write in &self.staged {
            match write {
                StagedWrite::Insert {
                    table: t,
                    primary_key: pk,
                    record,
                } if t == table && pk == primary_key && same_key(record.value(pk), key) => {
                    current = Some(record.clone());
                }
                StagedWrite::Update {
                    table: t,
                    primary_key: pk,
                    key: k,
                    changes,
                } if t == table && pk == primary_key && same_key(k, key) => {
                    if let Some(record) = current.as_mut() {
                        record.merge_from(changes);
                    }
                }
                StagedWrite::Delete {
                    table: t,
                    primary_key: pk,
                    key: k,
                } if t == table && pk == primary_key && same_key(k, key) => {
                    current = None;
                }
                _ => {}
            }
        }
        current
    }

    pub fn stage_delete(
        &mut self,
        table: &str,
        primary_key: &str,
        key: Value,
    ) -> BackendResult<()> {
        self.ensure_open()?;
        self.staged.push(StagedWrite::Delete {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            key,
        });
        Ok(())
    }

    pub fn stage_put_blob(
        &mut self,
        table: &str,
        reference: &str,
        bytes: Vec<u8>,
    ) -> BackendResult<()> {
        self.ensure_open()?;
        self.staged.push(StagedWrite::PutBlob {
            table: table.to_string(),
            reference: reference.to_string(),
            bytes,
        });
        Ok(())
    }

    pub fn stage_delete_blob(&mut self, table: &str, reference: &str) -> BackendResult<()> {
        self.ensure_open()?;
        self.staged.push(StagedWrite::DeleteBlob {
            table: table.to_string(),
            reference: reference.to_string(),
        });
        Ok(())
    }
}

impl Transaction for MemoryTransaction {
    fn commit(&mut self) -> BackendResult<()> {
        self.ensure_open()?;
        // Keys are checked again here: a concurrent dispatch may have
        // committed the same key since staging.
        self.store.apply(&self.staged)?;
        self.staged.clear();
        Ok(())
    }

    fn rollback(&mut self) -> BackendResult<()> {
        self.staged.clear();
        Ok(())
    }

    fn close(&mut self) -> BackendResult<()> {
        self.staged.clear();
        self.closed = true;
        Ok(())
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<MemoryRecordStore> {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .seed("person", "id", vec![Record::new().with("id", 1).with("name", "A")])
            .unwrap();
        store
    }

    #[test]
    fn test_staged_writes_invisible_until_commit() {
        let store = store();
        let mut tx = MemoryTransaction::new(store.clone());
        let inserted = tx
            .stage_insert("person", "id", Record::new().with("name", "B"))
            .unwrap();
        assert_eq!(inserted.value("id"), &Value::Integer(2));
        assert_eq!(store.len("person"), 1);

        tx.commit().unwrap();
        assert_eq!(store.len("person"), 2);
    }

    #[test]
    fn test_rollback_discards() {
        let store = store();
        let mut tx = MemoryTransaction::new(store.clone());
        tx.stage_delete("person", "id", Value::Integer(1)).unwrap();
        tx.rollback().unwrap();
        tx.commit().unwrap();
        assert_eq!(store.len("person"), 1);
    }

    #[test]
    fn test_duplicate_detected_at_staging() {
        let store = store();
        let mut tx = MemoryTransaction::new(store);
        let err = tx
            .stage_insert("person", "id", Record::new().with("id", 1))
            .unwrap_err();
        assert!(matches!(err, BackendError::DuplicateKey(_)));

        tx.stage_insert("person", "id", Record::new().with("id", 7))
            .unwrap();
        assert!(tx
            .stage_insert("person", "id", Record::new().with("id", 7))
            .is_err());
    }

    #[test]
    fn test_duplicate_detected_at_commit() {
        let store = store();
        let mut first = MemoryTransaction::new(store.clone());
        let mut second = MemoryTransaction::new(store.clone());
        first
            .stage_insert("person", "id", Record::new().with("id", 9))
            .unwrap();
        second
            .stage_insert("person", "id", Record::new().with("id", 9))
            .unwrap();

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(BackendError::DuplicateKey(_))));
        assert_eq!(store.len("person"), 2);
    }

    #[test]
    fn test_concurrent_updates_of_different_fields_both_land() {
        let store = store();
        let mut first = MemoryTransaction::new(store.clone());
        let mut second = MemoryTransaction::new(store.clone());
        first
            .stage_update("person", "id", Record::new().with("id", 1).with("age", 30))
            .unwrap();
        second
            .stage_update("person", "id", Record::new().with("id", 1).with("city", "X"))
            .unwrap();

        first.commit().unwrap();
        second.commit().unwrap();

        let row = store.find("person", "id", &Value::Integer(1)).unwrap();
        assert_eq!(row.value("name"), &Value::from("A"));
        assert_eq!(row.value("age"), &Value::Integer(30));
        assert_eq!(row.value("city"), &Value::from("X"));
    }

    #[test]
    fn test_update_of_row_deleted_at_commit_fails() {
        let store = store();
        let mut updater = MemoryTransaction::new(store.clone());
        updater
            .stage_update("person", "id", Record::new().with("id", 1).with("age", 30))
            .unwrap();

        let mut deleter = MemoryTransaction::new(store.clone());
        deleter.stage_delete("person", "id", Value::Integer(1)).unwrap();
        deleter.commit().unwrap();

        assert!(matches!(updater.commit(), Err(BackendError::NotFound(_))));
        assert_eq!(store.len("person"), 0);
    }

    #[test]
    fn test_update_sees_own_staged_writes() {
        let store = store();
        let mut tx = MemoryTransaction::new(store.clone());
        tx.stage_insert("person", "id", Record::new().with("id", 5).with("name", "E"))
            .unwrap();
        let updated = tx
            .stage_update("person", "id", Record::new().with("id", 5).with("age", 40))
            .unwrap();
        assert_eq!(updated.value("name"), &Value::from("E"));

        tx.stage_delete("person", "id", Value::Integer(1)).unwrap();
        let gone = tx.stage_update("person", "id", Record::new().with("id", 1));
        assert!(matches!(gone, Err(BackendError::NotFound(_))));

        tx.commit().unwrap();
        let row = store.find("person", "id", &Value::Integer(5)).unwrap();
        assert_eq!(row.value("age"), &Value::Integer(40));
    }

    #[test]
    fn test_insert_fails_when_key_sequence_exhausted() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .seed("person", "id", vec![Record::new().with("id", i64::MAX)])
            .unwrap();
        let mut tx = MemoryTransaction::new(store);
        let err = tx
            .stage_insert("person", "id", Record::new().with("name", "B"))
            .unwrap_err();
        assert!(matches!(err, BackendError::Execution(_)));
        assert!(tx.staged().is_empty());
    }

    #[test]
    fn test_update_merges_fields() {
        let store = store();
        let mut tx = MemoryTransaction::new(store.clone());
        let updated = tx
            .stage_update("person", "id", Record::new().with("id", 1).with("age", 30))
            .unwrap();
        assert_eq!(updated.value("name"), &Value::from("A"));
        assert_eq!(updated.value("age"), &Value::Integer(30));

        let missing = tx.stage_update("person", "id", Record::new().with("id", 5));
        assert!(matches!(missing, Err(BackendError::NotFound(_))));
    }

    #[test]
    fn test_closed_transaction_rejects_writes() {
        let mut tx = MemoryTransaction::new(store());
        tx.close().unwrap();
        assert!(tx.stage_delete("person", "id", Value::Integer(1)).is_err());
    }
}
