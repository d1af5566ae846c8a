//! Shared record store
//!
//! All tables and blobs live behind one `RwLock`. Transactions read the
//! committed state and hand their staged writes to [`MemoryRecordStore::apply`],
//! which validates and applies the whole batch under a single write lock.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::backend::{same_key, BackendError, BackendResult};
use crate::core::{Record, Value};
use crate::observability::Event;

/// One staged change
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    Insert {
        table: String,
        primary_key: String,
        record: Record,
    },
    /// Changed fields only, merged into the row as committed at apply time
    Update {
        table: String,
        primary_key: String,
        key: Value,
        changes: Record,
    },
    Delete {
        table: String,
        primary_key: String,
        key: Value,
    },
    PutBlob {
        table: String,
        reference: String,
        bytes: Vec<u8>,
    },
    DeleteBlob {
        table: String,
        reference: String,
    },
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    /// Insertion order is scan order
    rows: Vec<Record>,
    next_id: i64,
    /// Set once `i64::MAX` has been used or observed
    exhausted: bool,
}

impl MemoryTable {
    fn position(&self, primary_key: &str, key: &Value) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| same_key(r.value(primary_key), key))
    }

    fn observe_key(&mut self, key: &Value) {
        if let Value::Integer(id) = key {
            match id.checked_add(1) {
                Some(next) => self.next_id = self.next_id.max(next),
                None => self.exhausted = true,
            }
        }
    }

    fn next_key(&mut self, table: &str) -> BackendResult<i64> {
        if self.exhausted {
            return Err(BackendError::execution(format!(
                "key sequence exhausted for table '{}'",
                table
            )));
        }
        let id = self.next_id.max(1);
        match id.checked_add(1) {
            Some(next) => self.next_id = next,
            None => self.exhausted = true,
        }
        Ok(id)
    }
}

#[derive(Debug, Default)]
struct StoreData {
    tables: HashMap<String, MemoryTable>,
    blobs: HashMap<String, HashMap<String, Vec<u8>>>,
}

/// Thread-safe in-memory tables plus a blob area per table
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    data: RwLock<StoreData>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records directly, outside any transaction.
    ///
    /// Records without a key get the next sequence value.
    pub fn seed(
        &self,
        table: &str,
        primary_key: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> BackendResult<usize> {
        let mut data = self.data.write();
        let entry = data.tables.entry(table.to_string()).or_default();
        let mut working = entry.clone();
        let mut loaded = 0;

        for mut record in records {
            if record.value(primary_key).is_null() {
                let id = working.next_key(table)?;
                record.set(primary_key, id);
            }
            let key = record.value(primary_key).clone();
            if working.position(primary_key, &key).is_some() {
                return Err(BackendError::DuplicateKey(format!(
                    "{}.{}={}",
                    table, primary_key, key
                )));
            }
            working.observe_key(&key);
            working.rows.push(record);
            loaded += 1;
        }

        *entry = working;
        debug!(
            target: "backplane::memory",
            event = Event::StoreSeeded.as_str(),
            table = %table,
            records = loaded,
            "memory table seeded"
        );
        Ok(loaded)
    }

    /// Committed records of a table, in insertion order
    pub fn records(&self, table: &str) -> Vec<Record> {
        self.data
            .read()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn find(&self, table: &str, primary_key: &str, key: &Value) -> Option<Record> {
        let data = self.data.read();
        let t = data.tables.get(table)?;
        t.position(primary_key, key).map(|i| t.rows[i].clone())
    }

    pub fn contains_key(&self, table: &str, primary_key: &str, key: &Value) -> bool {
        self.data
            .read()
            .tables
            .get(table)
            .is_some_and(|t| t.position(primary_key, key).is_some())
    }

    pub fn len(&self, table: &str) -> usize {
        self.data
            .read()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Reserve the next integer key.
    ///
    /// Reserved keys are never handed out twice, even if the reserving
    /// transaction rolls back. Fails once the sequence passes `i64::MAX`.
    pub fn reserve_id(&self, table: &str) -> BackendResult<i64> {
        let mut data = self.data.write();
        data.tables
            .entry(table.to_string())
            .or_default()
            .next_key(table)
    }

    pub fn read_blob(&self, table: &str, reference: &str) -> Option<Vec<u8>> {
        self.data
            .read()
            .blobs
            .get(table)
            .and_then(|b| b.get(reference))
            .cloned()
    }

    /// Apply a batch atomically: either every write lands or none does
    pub fn apply(&self, writes: &[StagedWrite]) -> BackendResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut data = self.data.write();
        let mut tables: HashMap<String, MemoryTable> = HashMap::new();
        let mut blobs: HashMap<String, HashMap<String, Vec<u8>>> = HashMap::new();

        for write in writes {
            match write {
                StagedWrite::Insert {
                    table,
                    primary_key,
                    record,
                } => {
                    let t = working_table(&mut tables, &data, table);
                    let key = record.value(primary_key);
                    if t.position(primary_key, key).is_some() {
                        return Err(BackendError::DuplicateKey(format!(
                            "{}.{}={}",
                            table, primary_key, key
                        )));
                    }
                    t.observe_key(key);
                    t.rows.push(record.clone());
                }
                StagedWrite::Update {
                    table,
                    primary_key,
                    key,
                    changes,
                } => {
                    let t = working_table(&mut tables, &data, table);
                    let index = t.position(primary_key, key).ok_or_else(|| {
                        BackendError::NotFound(format!("{}.{}={}", table, primary_key, key))
                    })?;
                    t.rows[index].merge_from(changes);
                }
                StagedWrite::Delete {
                    table,
                    primary_key,
                    key,
                } => {
                    let t = working_table(&mut tables, &data, table);
                    if let Some(index) = t.position(primary_key, key) {
                        t.rows.remove(index);
                    }
                }
                StagedWrite::PutBlob {
                    table,
                    reference,
                    bytes,
                } => {
                    working_blobs(&mut blobs, &data, table)
                        .insert(reference.clone(), bytes.clone());
                }
                StagedWrite::DeleteBlob { table, reference } => {
                    working_blobs(&mut blobs, &data, table).remove(reference);
                }
            }
        }

        data.tables.extend(tables);
        data.blobs.extend(blobs);
        Ok(())
    }
}

fn working_table<'w>(
    working: &'w mut HashMap<String, MemoryTable>,
    data: &StoreData,
    table: &str,
) -> &'w mut MemoryTable {
    working
        .entry(table.to_string())
        .or_insert_with(|| data.tables.get(table).cloned().unwrap_or_default())
}

fn working_blobs<'w>(
    working: &'w mut HashMap<String, HashMap<String, Vec<u8>>>,
    data: &StoreData,
    table: &str,
) -> &'w mut HashMap<String, Vec<u8>> {
    working
        .entry(table.to_string())
        .or_insert_with(|| data.blobs.get(table).cloned().unwrap_or_default())
}
