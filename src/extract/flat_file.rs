use std::path::Path;

use log::debug;

use crate::error::EtlResult;
use crate::storage::table::Table;
use crate::storage::value::Value;

/// Read a CSV file with a header row. Empty fields are NULL and column types
/// are inferred from the cells.
pub fn read_csv_table(path: &Path) -> EtlResult<Table> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut raw = Vec::new();
    for record in reader.records() {
        let record = record?;
        raw.push(record.iter().map(str::to_string).collect());
    }
    debug!("read {} rows from {}", raw.len(), path.display());
    Ok(Table::from_raw(names, raw))
}

/// Write `table` as CSV with a header row. NULL becomes an empty field.
pub fn write_csv_table(path: &Path, table: &Table) -> EtlResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.column_names())?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Value::to_string_value))?;
    }
    writer.flush()?;
    Ok(())
}
