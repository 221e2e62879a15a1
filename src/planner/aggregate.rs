use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{EtlError, EtlResult};
use crate::sql::ast::{Expr, Select, SelectItem};
use crate::storage::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggFunc {
    Min,
    Max,
    Count,
    Sum,
    Avg,
}

impl AggFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MIN" => Some(AggFunc::Min),
            "MAX" => Some(AggFunc::Max),
            "COUNT" => Some(AggFunc::Count),
            "SUM" => Some(AggFunc::Sum),
            "AVG" => Some(AggFunc::Avg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
        }
    }
}

/// Running state of one aggregate over one group. NULL inputs are skipped.
#[derive(Debug)]
pub struct Accumulator {
    func: AggFunc,
    seen: Option<HashSet<Value>>,
    count: i64,
    int_sum: Option<i64>,
    real_sum: f64,
    best: Option<Value>,
}

impl Accumulator {
    pub fn new(func: AggFunc, distinct: bool) -> Self {
        Accumulator {
            func,
            seen: distinct.then(HashSet::new),
            count: 0,
            int_sum: Some(0),
            real_sum: 0.0,
            best: None,
        }
    }

    pub fn update(&mut self, value: Value) -> EtlResult<()> {
        if value.is_null() {
            return Ok(());
        }
        if let Some(seen) = &mut self.seen {
            if !seen.insert(value.join_key()) {
                return Ok(());
            }
        }
        self.count += 1;
        match self.func {
            AggFunc::Count => {}
            AggFunc::Sum | AggFunc::Avg => {
                let f = value.as_f64().ok_or_else(|| {
                    EtlError::InvalidValue(format!("{} over non-numeric value '{}'", self.func.as_str(), value))
                })?;
                self.real_sum += f;
                self.int_sum = match (self.int_sum, &value) {
                    (Some(acc), Value::Integer(i)) => acc.checked_add(*i),
                    _ => None,
                };
            }
            AggFunc::Min | AggFunc::Max => {
                let wanted = if self.func == AggFunc::Min { Ordering::Less } else { Ordering::Greater };
                let replace = match &self.best {
                    None => true,
                    Some(best) => value.total_cmp(best) == wanted,
                };
                if replace {
                    self.best = Some(value);
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Value {
        match self.func {
            AggFunc::Count => Value::Integer(self.count),
            _ if self.count == 0 => Value::Null,
            AggFunc::Sum => match self.int_sum {
                Some(i) => Value::Integer(i),
                None => Value::Real(self.real_sum),
            },
            AggFunc::Avg => Value::Real(self.real_sum / self.count as f64),
            AggFunc::Min | AggFunc::Max => self.best.unwrap_or(Value::Null),
        }
    }
}

/// Reject aggregate calls where no group exists yet.
pub fn validate_select(select: &Select) -> EtlResult<()> {
    if let Some(selection) = &select.selection {
        if selection.contains_aggregate() {
            return Err(EtlError::InvalidValue("aggregate functions are not allowed in WHERE".into()));
        }
    }
    if select.group_by.iter().any(Expr::contains_aggregate) {
        return Err(EtlError::InvalidValue("aggregate functions are not allowed in GROUP BY".into()));
    }
    if let Some(from) = &select.from {
        if from.joins.iter().any(|j| j.on.contains_aggregate()) {
            return Err(EtlError::InvalidValue("aggregate functions are not allowed in ON".into()));
        }
    }
    for item in &select.projection {
        if let SelectItem::Expr { expr, .. } = item {
            check_nested(expr, false)?;
        }
    }
    if let Some(having) = &select.having {
        check_nested(having, false)?;
    }
    Ok(())
}

fn check_nested(expr: &Expr, inside_aggregate: bool) -> EtlResult<()> {
    let is_agg = expr.is_aggregate_call();
    if is_agg && inside_aggregate {
        return Err(EtlError::InvalidValue(format!("nested aggregate in '{}'", expr)));
    }
    for child in expr.children() {
        check_nested(child, inside_aggregate || is_agg)?;
    }
    Ok(())
}
