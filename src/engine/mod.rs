use log::debug;

use crate::catalog::Catalog;
use crate::error::EtlResult;
use crate::execution::execute_select;
use crate::sql::ast::Statement;
use crate::sql::parser::parse_statement;
use crate::storage::table::Table;

/// Read-only view of a relational store.
pub trait Store {
    /// Run one SQL statement and return its result rows.
    fn submit(&self, sql: &str) -> EtlResult<Table>;

    /// Fetch a whole table by name.
    fn read_table(&self, name: &str) -> EtlResult<Table>;
}

/// In-memory relational store.
#[derive(Debug, Default)]
pub struct Engine {
    pub catalog: Catalog,
}

impl Engine {
    pub fn new() -> Self {
        Engine { catalog: Catalog::new() }
    }

    /// Store `table` under `name`, replacing whatever was there.
    pub fn write_table(&mut self, name: &str, table: Table) {
        if self.catalog.replace_table(name, table).is_some() {
            debug!("replaced table {}", name);
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        self.catalog.table_names()
    }
}

impl Store for Engine {
    fn submit(&self, sql: &str) -> EtlResult<Table> {
        debug!("submitting query: {}", sql.trim());
        match parse_statement(sql)? {
            Statement::Select(select) => execute_select(&self.catalog, &select),
        }
    }

    fn read_table(&self, name: &str) -> EtlResult<Table> {
        self.catalog.get_table(name).cloned()
    }
}
