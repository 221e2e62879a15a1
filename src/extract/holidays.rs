use log::info;
use serde::Deserialize;

use crate::error::{EtlError, EtlResult};
use crate::storage::table::Table;
use crate::storage::value::{parse_datetime, Value};

/// One entry of the Nager.Date `PublicHolidays` response. `counties` and
/// `types` are not kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHoliday {
    pub date: String,
    pub local_name: String,
    pub name: String,
    pub country_code: String,
    #[serde(default)]
    pub fixed: Option<bool>,
    #[serde(default)]
    pub global: Option<bool>,
    #[serde(default)]
    pub launch_year: Option<i64>,
}

const COLUMNS: [&str; 7] = ["date", "localName", "name", "countryCode", "fixed", "global", "launchYear"];

/// Fetch `{base_url}/{year}/{country}` and decode it into a table.
pub fn get_public_holidays(base_url: &str, year: i32, country: &str) -> EtlResult<Table> {
    let url = format!("{}/{}/{}", base_url.trim_end_matches('/'), year, country);
    info!("fetching public holidays from {}", url);
    let body = reqwest::blocking::get(&url)?.error_for_status()?.text()?;
    parse_public_holidays(&body)
}

/// Decode a holiday feed payload. `date` becomes a timestamp at midnight.
pub fn parse_public_holidays(json: &str) -> EtlResult<Table> {
    let holidays: Vec<PublicHoliday> = serde_json::from_str(json)?;
    let mut rows = Vec::with_capacity(holidays.len());
    for h in holidays {
        let date = parse_datetime(&h.date)
            .ok_or_else(|| EtlError::ParseError(format!("invalid holiday date '{}'", h.date)))?;
        rows.push(vec![
            Value::DateTime(date),
            Value::text(&h.local_name),
            Value::text(&h.name),
            Value::text(&h.country_code),
            h.fixed.map(Value::Boolean).unwrap_or(Value::Null),
            h.global.map(Value::Boolean).unwrap_or(Value::Null),
            h.launch_year.map(Value::Integer).unwrap_or(Value::Null),
        ]);
    }
    Ok(Table::from_rows(COLUMNS.iter().map(|c| c.to_string()).collect(), rows))
}
