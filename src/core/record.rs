//! Records
//!
//! A record is one logical row: an insertion-ordered mapping of field name
//! to value. Backends may attach private provenance (for example the file a
//! row was read from) in `backend_detail`, which is never part of the
//! logical row.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Insertion-ordered field map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMap {
    order: Vec<String>,
    values: HashMap<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by field name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a value, keeping the original position for existing fields
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if !self.values.contains_key(&field) {
            self.order.push(field.clone());
        }
        self.values.insert(field, value.into());
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let removed = self.values.remove(field);
        if removed.is_some() {
            self.order.retain(|f| f != field);
        }
        removed
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(move |f| self.values.get(f).map(|v| (f.as_str(), v)))
    }

    /// Field names in insertion order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// One logical row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: FieldMap,
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    backend_detail: FieldMap,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.set(field, value);
        self
    }

    /// Builder-style backend detail setter
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.backend_detail.set(key, value);
        self
    }

    /// Field value, or `None` when the field is absent
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Field value with absent fields read as null
    pub fn value(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.set(field, value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    pub fn values(&self) -> &FieldMap {
        &self.values
    }

    pub fn backend_detail(&self) -> &FieldMap {
        &self.backend_detail
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.backend_detail.get(key)
    }

    pub fn set_detail(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.backend_detail.set(key, value);
    }

    /// Apply every field of `other` onto this record
    pub fn merge_from(&mut self, other: &Record) {
        for (field, value) in other.values.iter() {
            self.values.set(field, value.clone());
        }
    }

    /// Compare logical values only, ignoring backend detail
    pub fn same_values(&self, other: &Record) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .all(|(f, v)| other.values.get(f) == Some(v))
    }
}
