use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::error::{EtlError, EtlResult};
use crate::storage::value::Value;

/// Julian day number of the Unix epoch.
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub struct FunctionEvaluator;

impl FunctionEvaluator {
    /// Evaluate a scalar function. `name` must already be upper-case.
    pub fn evaluate_function(name: &str, args: &[Value]) -> EtlResult<Value> {
        match name {
            "STRFTIME" => {
                arity(name, args, 2, 2)?;
                let fmt = match &args[0] {
                    Value::Null => return Ok(Value::Null),
                    v => v.to_string_value(),
                };
                match args[1].as_datetime() {
                    Some(dt) => strftime(&fmt, &dt),
                    None => Ok(Value::Null),
                }
            }
            "JULIANDAY" => {
                arity(name, args, 1, 1)?;
                Ok(args[0].as_datetime().map(julian_day).map(Value::Real).unwrap_or(Value::Null))
            }
            "DATE" => {
                arity(name, args, 1, 1)?;
                Ok(args[0]
                    .as_datetime()
                    .map(|dt| Value::text(&dt.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Value::Null))
            }
            "DATETIME" => {
                arity(name, args, 1, 1)?;
                Ok(args[0]
                    .as_datetime()
                    .map(|dt| Value::text(&dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                    .unwrap_or(Value::Null))
            }
            "UPPER" | "LOWER" => {
                arity(name, args, 1, 1)?;
                Ok(match &args[0] {
                    Value::Null => Value::Null,
                    v if name == "UPPER" => Value::text(&v.to_string_value().to_uppercase()),
                    v => Value::text(&v.to_string_value().to_lowercase()),
                })
            }
            "LENGTH" => {
                arity(name, args, 1, 1)?;
                Ok(match &args[0] {
                    Value::Null => Value::Null,
                    v => Value::Integer(v.to_string_value().chars().count() as i64),
                })
            }
            "ABS" => {
                arity(name, args, 1, 1)?;
                match &args[0] {
                    Value::Null => Ok(Value::Null),
                    Value::Integer(i) => Ok(i.checked_abs().map(Value::Integer).unwrap_or(Value::Real(-(*i as f64)))),
                    v => numeric(name, v).map(|f| Value::Real(f.abs())),
                }
            }
            "ROUND" => {
                arity(name, args, 1, 2)?;
                if args.iter().any(Value::is_null) {
                    return Ok(Value::Null);
                }
                let x = numeric(name, &args[0])?;
                let digits = match args.get(1) {
                    Some(d) => numeric(name, d)? as i32,
                    None => 0,
                };
                let factor = 10f64.powi(digits.max(0));
                Ok(Value::Real((x * factor).round() / factor))
            }
            "COALESCE" | "IFNULL" => {
                if name == "IFNULL" {
                    arity(name, args, 2, 2)?;
                } else if args.is_empty() {
                    return Err(EtlError::InvalidValue("COALESCE needs at least one argument".into()));
                }
                Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
            }
            "NULLIF" => {
                arity(name, args, 2, 2)?;
                if args[0].sql_cmp(&args[1]) == Some(std::cmp::Ordering::Equal) {
                    Ok(Value::Null)
                } else {
                    Ok(args[0].clone())
                }
            }
            "SUBSTR" | "SUBSTRING" => {
                arity(name, args, 2, 3)?;
                if args.iter().any(Value::is_null) {
                    return Ok(Value::Null);
                }
                let chars: Vec<char> = args[0].to_string_value().chars().collect();
                let start = numeric(name, &args[1])? as i64;
                // positions are 1-based; a start below 1 eats into the length
                let begin = usize::try_from(start.max(1) - 1).unwrap_or(usize::MAX);
                let len = match args.get(2) {
                    Some(l) => {
                        let shift = if start < 1 { start.saturating_sub(1) } else { 0 };
                        let l = (numeric(name, l)? as i64).saturating_add(shift);
                        usize::try_from(l.max(0)).unwrap_or(usize::MAX)
                    }
                    None => chars.len(),
                };
                Ok(Value::text(&chars.iter().skip(begin).take(len).collect::<String>()))
            }
            _ => Err(EtlError::UnknownFunction(name.to_string())),
        }
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> EtlResult<()> {
    if args.len() < min || args.len() > max {
        return Err(EtlError::InvalidValue(format!(
            "wrong number of arguments to {}: {}",
            name,
            args.len()
        )));
    }
    Ok(())
}

fn numeric(name: &str, v: &Value) -> EtlResult<f64> {
    v.as_f64()
        .ok_or_else(|| EtlError::InvalidValue(format!("{} expects a number, got '{}'", name, v)))
}

pub fn julian_day(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JULIAN_DAY
}

fn strftime(fmt: &str, dt: &NaiveDateTime) -> EtlResult<Value> {
    let mut out = String::new();
    write!(out, "{}", dt.format(fmt))
        .map_err(|_| EtlError::InvalidValue(format!("invalid strftime format '{}'", fmt)))?;
    Ok(Value::text(&out))
}
