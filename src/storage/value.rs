use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EtlError, EtlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Column holding nothing but nulls.
    Null,
    Integer,
    Real,
    Text,
    Boolean,
    Date,
    DateTime,
}

impl ColumnType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" => Some(ColumnType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" | "DECIMAL" => Some(ColumnType::Real),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Some(ColumnType::Text),
            "BOOLEAN" | "BOOL" => Some(ColumnType::Boolean),
            "DATE" => Some(ColumnType::Date),
            "DATETIME" | "TIMESTAMP" => Some(ColumnType::DateTime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Null => "NULL",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
        }
    }

    /// Widest type able to hold values of both `self` and `other`.
    pub fn unify(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Null, t) | (t, Null) => t,
            (Integer, Real) | (Real, Integer) => Real,
            (Date, DateTime) | (DateTime, Date) => DateTime,
            _ => Text,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(Arc<str>),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Bit pattern used for equality and hashing of reals. Both zeros and all
/// NaNs collapse to one pattern each.
fn real_bits(f: f64) -> u64 {
    if f == 0.0 {
        0
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

// Structural equality: NaN equals NaN, so values work as grouping keys.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Integer(a), Integer(b)) => a == b,
            (Real(a), Real(b)) => real_bits(*a) == real_bits(*b),
            (Text(a), Text(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(i) => i.hash(state),
            Value::Real(f) => real_bits(*f).hash(state),
            Value::Text(s) => s.hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

impl Value {
    pub fn text(s: &str) -> Value {
        Value::Text(Arc::from(s))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Real,
            Value::Text(_) => ColumnType::Text,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Date(_) => ColumnType::Date,
            Value::DateTime(_) => ColumnType::DateTime,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Real(f) => Some(*f != 0.0),
            Value::Text(s) => s.trim().parse::<f64>().ok().map(|f| f != 0.0),
            _ => None,
        }
    }

    /// Timestamp view of the value. Dates map to midnight; text is parsed
    /// with [`parse_datetime`].
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::Text(s) => parse_datetime(s),
            _ => None,
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Key used for hash joins: integral reals collapse onto integers so that
    /// `1` and `1.0` land in the same bucket.
    pub fn join_key(&self) -> Value {
        match self {
            Value::Real(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Integer(*f as i64),
            other => other.clone(),
        }
    }

    /// SQL comparison. `None` when either side is NULL or the values are not
    /// comparable.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(_) | Real(_), Integer(_) | Real(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (Text(a), Text(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Date(_) | DateTime(_), _) | (_, Date(_) | DateTime(_)) => {
                Some(self.as_datetime()?.cmp(&other.as_datetime()?))
            }
            (Integer(_) | Real(_) | Boolean(_), Text(_)) | (Text(_), Integer(_) | Real(_) | Boolean(_)) => {
                match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    // numbers sort before text
                    _ if matches!(self, Text(_)) => Some(Ordering::Greater),
                    _ => Some(Ordering::Less),
                }
            }
            (Boolean(_), _) | (_, Boolean(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Real(_) => 2,
            Value::Date(_) | Value::DateTime(_) => 3,
            Value::Text(_) => 4,
        }
    }

    /// Total order used by ORDER BY and grouping: NULLs first, then booleans,
    /// numbers, temporal values and text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        let rank = self.sort_rank().cmp(&other.sort_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Value::Real(_) | Value::Integer(_), Value::Real(_) | Value::Integer(_)) => {
                let (a, b) = (self.as_f64().unwrap_or(0.0), other.as_f64().unwrap_or(0.0));
                a.total_cmp(&b)
            }
            _ => self.sql_cmp(other).unwrap_or(Ordering::Equal),
        }
    }

    pub fn cast(&self, ty: ColumnType) -> EtlResult<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let invalid = || EtlError::InvalidValue(format!("cannot cast '{}' to {}", self, ty.as_str()));
        Ok(match ty {
            ColumnType::Null => Value::Null,
            ColumnType::Integer => match self {
                Value::Integer(i) => Value::Integer(*i),
                Value::Real(f) => Value::Integer(f.trunc() as i64),
                Value::Boolean(b) => Value::Integer(*b as i64),
                Value::Text(s) => match s.trim().parse::<i64>() {
                    Ok(i) => Value::Integer(i),
                    Err(_) => Value::Integer(s.trim().parse::<f64>().map(|f| f.trunc() as i64).unwrap_or(0)),
                },
                _ => return Err(invalid()),
            },
            ColumnType::Real => match self {
                Value::Text(s) => Value::Real(s.trim().parse::<f64>().unwrap_or(0.0)),
                other => Value::Real(other.as_f64().ok_or_else(invalid)?),
            },
            ColumnType::Text => Value::text(&self.to_string_value()),
            ColumnType::Boolean => Value::Boolean(self.as_bool().ok_or_else(invalid)?),
            ColumnType::Date => Value::Date(self.as_datetime().ok_or_else(invalid)?.date()),
            ColumnType::DateTime => Value::DateTime(self.as_datetime().ok_or_else(invalid)?),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse the timestamp layouts found in the raw CSV files and holiday feed.
/// A bare date parses as midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
