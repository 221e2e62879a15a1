use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};

use crate::engine::Store;
use crate::error::{EtlError, EtlResult};
use crate::storage::table::{Column, Table};
use crate::storage::value::{ColumnType, Value};
use crate::transform::{ORDERS, PUBLIC_HOLIDAYS};

const YEAR: i32 = 2017;

/// Orders placed per calendar day of 2017, flagged when the day is a public
/// holiday. Orders whose purchase timestamp is missing or unparseable are
/// left out and counted in a warning.
pub fn orders_per_day_and_holidays_2017(store: &dyn Store) -> EtlResult<Table> {
    let holidays = store.read_table(PUBLIC_HOLIDAYS)?;
    let orders = store.read_table(ORDERS)?;

    let mut holiday_dates = HashSet::new();
    for v in holidays.column("date")? {
        let date = normalize(v).ok_or_else(|| {
            EtlError::ParseError(format!("unparseable holiday date '{}'", v))
        })?;
        holiday_dates.insert(date);
    }

    let mut counts: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut skipped = 0usize;
    for v in orders.column("order_purchase_timestamp")? {
        match normalize(v) {
            Some(date) if date.year() == YEAR => *counts.entry(date).or_insert(0) += 1,
            Some(_) => {}
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            "{} orders without a parseable order_purchase_timestamp were left out",
            skipped
        );
    }
    debug!("{} order days in {}", counts.len(), YEAR);

    let mut out = Table::new(vec![
        Column::new("order_count", ColumnType::Integer),
        Column::new("date", ColumnType::Date),
        Column::new("holiday", ColumnType::Boolean),
    ]);
    for (date, count) in counts {
        out.push_row(vec![
            Value::Integer(count),
            Value::Date(date),
            Value::Boolean(holiday_dates.contains(&date)),
        ])?;
    }
    Ok(out)
}

/// Calendar date of a timestamp-like value, dropping the time of day.
fn normalize(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::Null => None,
        other => other.as_datetime().map(|dt| dt.date()),
    }
}
