use indexmap::IndexMap;
use log::info;

use crate::engine::Engine;
use crate::storage::table::Table;

/// Write every table into the engine, replacing tables of the same name.
pub fn load(tables: IndexMap<String, Table>, engine: &mut Engine) {
    for (name, table) in tables {
        info!("loading {} ({} rows)", name, table.num_rows());
        engine.write_table(&name, table);
    }
}
