use std::collections::HashMap;

use log::debug;

use crate::error::{EtlError, EtlResult};
use crate::storage::table::Table;

/// The Catalog holds every named table of the store.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog { tables: HashMap::new() }
    }

    /// Store `table` under `name`, replacing any table already registered
    /// under that name. Returns the replaced table.
    pub fn replace_table(&mut self, name: &str, table: Table) -> Option<Table> {
        let key = self.resolve_name(name).unwrap_or_else(|| name.to_string());
        debug!(
            "catalog: storing '{}' ({} columns, {} rows)",
            key,
            table.num_columns(),
            table.num_rows()
        );
        self.tables.insert(key, table)
    }

    /// Look up a table, or return an error if it doesn't exist. Names match
    /// exactly first, then case-insensitively.
    pub fn get_table(&self, name: &str) -> EtlResult<&Table> {
        self.resolve_name(name)
            .and_then(|key| self.tables.get(&key))
            .ok_or_else(|| EtlError::TableNotFound(name.to_string()))
    }

    pub fn drop_table(&mut self, name: &str) -> EtlResult<Table> {
        let key = self
            .resolve_name(name)
            .ok_or_else(|| EtlError::TableNotFound(name.to_string()))?;
        self.tables
            .remove(&key)
            .ok_or_else(|| EtlError::TableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve_name(name).is_some()
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve_name(&self, name: &str) -> Option<String> {
        if self.tables.contains_key(name) {
            return Some(name.to_string());
        }
        self.tables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
    }
}
