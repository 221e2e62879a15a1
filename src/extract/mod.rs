//! Getting raw data in: the dataset archive, its CSV files and the public
//! holiday feed.

pub mod acquisition;
pub mod flat_file;
pub mod holidays;

use std::path::Path;

use indexmap::IndexMap;
use log::info;

use crate::error::EtlResult;
use crate::storage::table::Table;
use crate::transform::PUBLIC_HOLIDAYS;

pub use acquisition::ensure_datasets_available;
pub use flat_file::{read_csv_table, write_csv_table};
pub use holidays::{get_public_holidays, parse_public_holidays};

/// Read every CSV file in `mapping` from `csv_dir`, keyed by table name.
pub fn read_raw_tables(csv_dir: &Path, mapping: &IndexMap<String, String>) -> EtlResult<IndexMap<String, Table>> {
    let mut tables = IndexMap::with_capacity(mapping.len() + 1);
    for (file, table_name) in mapping {
        let table = read_csv_table(&csv_dir.join(file))?;
        info!("{} -> {} ({} rows)", file, table_name, table.num_rows());
        tables.insert(table_name.clone(), table);
    }
    Ok(tables)
}

/// Raw tables plus the `public_holidays` table for `year` and `country`.
pub fn extract(
    csv_dir: &Path,
    mapping: &IndexMap<String, String>,
    holidays_url: &str,
    year: i32,
    country: &str,
) -> EtlResult<IndexMap<String, Table>> {
    let mut tables = read_raw_tables(csv_dir, mapping)?;
    let holidays = get_public_holidays(holidays_url, year, country)?;
    info!("{} public holidays for {} {}", holidays.num_rows(), country, year);
    tables.insert(PUBLIC_HOLIDAYS.to_string(), holidays);
    Ok(tables)
}
