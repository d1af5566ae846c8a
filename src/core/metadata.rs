//! Instance metadata
//!
//! The minimal slice of table and backend metadata the dispatcher needs:
//! a table names the backend it lives in, and a backend names the module
//! type that serves it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configured storage backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendMetaData {
    /// Backend name referenced by tables
    pub name: String,

    /// Registry key of the module that serves this backend
    pub backend_type: String,

    /// Module-specific settings (connection strings, base paths, ...)
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl BackendMetaData {
    pub fn new(name: impl Into<String>, backend_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_type: backend_type.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Configured table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetaData {
    pub name: String,

    /// Name of the `BackendMetaData` holding this table
    pub backend_name: String,

    /// Field used by Get, Update and Delete to address single records
    #[serde(default = "default_primary_key")]
    pub primary_key_field: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl TableMetaData {
    pub fn new(name: impl Into<String>, backend_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_name: backend_name.into(),
            primary_key_field: default_primary_key(),
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key_field = field.into();
        self
    }
}

/// The set of backends and tables an application is configured with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default)]
    backends: HashMap<String, BackendMetaData>,
    #[serde(default)]
    tables: HashMap<String, TableMetaData>,
}

impl Instance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendMetaData) -> Self {
        self.add_backend(backend);
        self
    }

    pub fn with_table(mut self, table: TableMetaData) -> Self {
        self.add_table(table);
        self
    }

    pub fn add_backend(&mut self, backend: BackendMetaData) {
        self.backends.insert(backend.name.clone(), backend);
    }

    pub fn add_table(&mut self, table: TableMetaData) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn backend(&self, name: &str) -> Option<&BackendMetaData> {
        self.backends.get(name)
    }

    pub fn table(&self, name: &str) -> Option<&TableMetaData> {
        self.tables.get(name)
    }

    /// Backend holding the given table
    pub fn backend_for_table(&self, table: &str) -> Option<&BackendMetaData> {
        self.table(table).and_then(|t| self.backend(&t.backend_name))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}
