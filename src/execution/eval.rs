use std::cmp::Ordering;

use crate::error::{EtlError, EtlResult};
use crate::planner::aggregate::{Accumulator, AggFunc};
use crate::sql::ast::{BinaryOp, Expr, UnaryOp};
use crate::sql::functions::FunctionEvaluator;
use crate::storage::table::Table;
use crate::storage::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeColumn {
    pub qualifier: Option<String>,
    pub name: String,
}

/// Column layout of the rows flowing through a query.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub columns: Vec<ScopeColumn>,
}

impl Scope {
    pub fn from_table(qualifier: &str, table: &Table) -> Self {
        Scope {
            columns: table
                .columns
                .iter()
                .map(|c| ScopeColumn { qualifier: Some(qualifier.to_string()), name: c.name.clone() })
                .collect(),
        }
    }

    pub fn unqualified(names: &[String]) -> Self {
        Scope {
            columns: names
                .iter()
                .map(|n| ScopeColumn { qualifier: None, name: n.clone() })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn concat(&self, other: &Scope) -> Scope {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Scope { columns }
    }

    pub fn resolve(&self, table: Option<&str>, name: &str) -> EtlResult<usize> {
        let mut found = None;
        for (i, col) in self.columns.iter().enumerate() {
            if !col.name.eq_ignore_ascii_case(name) {
                continue;
            }
            if let Some(t) = table {
                match &col.qualifier {
                    Some(q) if q.eq_ignore_ascii_case(t) => {}
                    _ => continue,
                }
            }
            if found.is_some() {
                return Err(EtlError::AmbiguousColumn(display_ref(table, name)));
            }
            found = Some(i);
        }
        found.ok_or_else(|| EtlError::ColumnNotFound(display_ref(table, name)))
    }

    /// Positions of every column carrying `qualifier`.
    pub fn qualified_positions(&self, qualifier: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.qualifier.as_deref().is_some_and(|q| q.eq_ignore_ascii_case(qualifier)))
            .map(|(i, _)| i)
            .collect()
    }
}

fn display_ref(table: Option<&str>, name: &str) -> String {
    match table {
        Some(t) => format!("{}.{}", t, name),
        None => name.to_string(),
    }
}

/// Where column references and aggregate calls get their values from.
pub trait EvalContext {
    fn column(&self, table: Option<&str>, name: &str) -> EtlResult<Value>;
    fn column_at(&self, idx: usize) -> Value;
    fn aggregate(&self, expr: &Expr) -> EtlResult<Value>;
}

/// A single row.
pub struct RowContext<'a> {
    pub scope: &'a Scope,
    pub row: &'a [Value],
}

impl EvalContext for RowContext<'_> {
    fn column(&self, table: Option<&str>, name: &str) -> EtlResult<Value> {
        let idx = self.scope.resolve(table, name)?;
        Ok(self.row.get(idx).cloned().unwrap_or(Value::Null))
    }

    fn column_at(&self, idx: usize) -> Value {
        self.row.get(idx).cloned().unwrap_or(Value::Null)
    }

    fn aggregate(&self, expr: &Expr) -> EtlResult<Value> {
        Err(EtlError::InvalidValue(format!("misuse of aggregate '{}'", expr)))
    }
}

/// The rows of one group. Bare columns read from the first row.
pub struct GroupContext<'a> {
    pub scope: &'a Scope,
    pub rows: &'a [&'a [Value]],
}

impl EvalContext for GroupContext<'_> {
    fn column(&self, table: Option<&str>, name: &str) -> EtlResult<Value> {
        let idx = self.scope.resolve(table, name)?;
        Ok(self.column_at(idx))
    }

    fn column_at(&self, idx: usize) -> Value {
        self.rows
            .first()
            .and_then(|r| r.get(idx))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn aggregate(&self, expr: &Expr) -> EtlResult<Value> {
        let (func, arg, distinct) = match expr {
            Expr::CountStar => return Ok(Value::Integer(self.rows.len() as i64)),
            Expr::Function { name, args, distinct } => {
                let func = AggFunc::from_name(name)
                    .ok_or_else(|| EtlError::UnknownFunction(name.clone()))?;
                if args.len() != 1 {
                    return Err(EtlError::InvalidValue(format!(
                        "{} takes exactly one argument",
                        func.as_str()
                    )));
                }
                (func, &args[0], *distinct)
            }
            other => return Err(EtlError::InvalidValue(format!("'{}' is not an aggregate", other))),
        };
        let mut acc = Accumulator::new(func, distinct);
        for row in self.rows {
            let ctx = RowContext { scope: self.scope, row };
            acc.update(evaluate(arg, &ctx)?)?;
        }
        Ok(acc.finish())
    }
}

/// Truth value for three-valued logic: `None` is unknown.
pub fn truth(v: &Value) -> Option<bool> {
    if v.is_null() {
        None
    } else {
        Some(v.as_bool().unwrap_or(false))
    }
}

pub fn is_true(v: &Value) -> bool {
    truth(v) == Some(true)
}

fn from_truth(t: Option<bool>) -> Value {
    t.map(Value::Boolean).unwrap_or(Value::Null)
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

pub fn evaluate(expr: &Expr, ctx: &dyn EvalContext) -> EtlResult<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Column { table, name } => ctx.column(table.as_deref(), name),
        Expr::CountStar => ctx.aggregate(expr),
        Expr::Function { .. } if expr.is_aggregate_call() => ctx.aggregate(expr),
        Expr::Function { name, args, .. } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, ctx))
                .collect::<EtlResult<Vec<_>>>()?;
            FunctionEvaluator::evaluate_function(name, &values)
        }
        Expr::Unary { op: UnaryOp::Not, expr } => {
            Ok(from_truth(truth(&evaluate(expr, ctx)?).map(|b| !b)))
        }
        Expr::Unary { op: UnaryOp::Minus, expr } => match evaluate(expr, ctx)? {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => Ok(i.checked_neg().map(Value::Integer).unwrap_or(Value::Real(-(i as f64)))),
            Value::Real(f) => Ok(Value::Real(-f)),
            other => other
                .as_f64()
                .map(|f| Value::Real(-f))
                .ok_or_else(|| EtlError::InvalidValue(format!("cannot negate '{}'", other))),
        },
        Expr::Binary { left, op: BinaryOp::And, right } => {
            let l = truth(&evaluate(left, ctx)?);
            if l == Some(false) {
                return Ok(Value::Boolean(false));
            }
            let r = truth(&evaluate(right, ctx)?);
            Ok(from_truth(and3(l, r)))
        }
        Expr::Binary { left, op: BinaryOp::Or, right } => {
            let l = truth(&evaluate(left, ctx)?);
            if l == Some(true) {
                return Ok(Value::Boolean(true));
            }
            let r = truth(&evaluate(right, ctx)?);
            Ok(from_truth(or3(l, r)))
        }
        Expr::Binary { left, op, right } => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            binary_op(*op, &l, &r)
        }
        Expr::IsNull { expr, negated } => Ok(Value::Boolean(evaluate(expr, ctx)?.is_null() != *negated)),
        Expr::InList { expr, list, negated } => {
            let v = evaluate(expr, ctx)?;
            if v.is_null() {
                return Ok(Value::Null);
            }
            let mut saw_null = false;
            for item in list {
                let candidate = evaluate(item, ctx)?;
                match v.sql_cmp(&candidate) {
                    Some(Ordering::Equal) => return Ok(Value::Boolean(!*negated)),
                    None => saw_null = true,
                    _ => {}
                }
            }
            if saw_null {
                Ok(Value::Null)
            } else {
                Ok(Value::Boolean(*negated))
            }
        }
        Expr::Between { expr, low, high, negated } => {
            let v = evaluate(expr, ctx)?;
            let lo = evaluate(low, ctx)?;
            let hi = evaluate(high, ctx)?;
            let above = v.sql_cmp(&lo).map(|o| o != Ordering::Less);
            let below = v.sql_cmp(&hi).map(|o| o != Ordering::Greater);
            let inside = and3(above, below);
            Ok(from_truth(if *negated { inside.map(|b| !b) } else { inside }))
        }
        Expr::Like { expr, pattern, negated } => {
            let v = evaluate(expr, ctx)?;
            let p = evaluate(pattern, ctx)?;
            if v.is_null() || p.is_null() {
                return Ok(Value::Null);
            }
            let matched = like_match(&p.to_string_value(), &v.to_string_value());
            Ok(Value::Boolean(matched != *negated))
        }
        Expr::Case { operand, branches, else_result } => {
            let subject = match operand {
                Some(op) => Some(evaluate(op, ctx)?),
                None => None,
            };
            for (when, then) in branches {
                let w = evaluate(when, ctx)?;
                let hit = match &subject {
                    Some(s) => s.sql_cmp(&w) == Some(Ordering::Equal),
                    None => is_true(&w),
                };
                if hit {
                    return evaluate(then, ctx);
                }
            }
            match else_result {
                Some(e) => evaluate(e, ctx),
                None => Ok(Value::Null),
            }
        }
        Expr::Cast { expr, ty } => evaluate(expr, ctx)?.cast(*ty),
    }
}

fn binary_op(op: BinaryOp, l: &Value, r: &Value) -> EtlResult<Value> {
    use BinaryOp::*;
    match op {
        Eq | NotEq | Lt | LtEq | Gt | GtEq => Ok(match l.sql_cmp(r) {
            None => Value::Null,
            Some(ord) => Value::Boolean(match op {
                Eq => ord == Ordering::Equal,
                NotEq => ord != Ordering::Equal,
                Lt => ord == Ordering::Less,
                LtEq => ord != Ordering::Greater,
                Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
        }),
        Concat => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::text(&format!("{}{}", l.to_string_value(), r.to_string_value())))
        }
        Plus | Minus | Multiply | Divide | Modulo => arithmetic(op, l, r),
        And => Ok(from_truth(and3(truth(l), truth(r)))),
        Or => Ok(from_truth(or3(truth(l), truth(r)))),
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> EtlResult<Value> {
    use BinaryOp::*;
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if let (Value::Integer(a), Value::Integer(b)) = (l, r) {
        let exact = match op {
            Plus => a.checked_add(*b),
            Minus => a.checked_sub(*b),
            Multiply => a.checked_mul(*b),
            Divide if *b == 0 => return Ok(Value::Null),
            Divide => a.checked_div(*b),
            Modulo if *b == 0 => return Ok(Value::Null),
            _ => a.checked_rem(*b),
        };
        if let Some(i) = exact {
            return Ok(Value::Integer(i));
        }
    }
    let operand = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| EtlError::InvalidValue(format!("'{}' is not numeric", v)))
    };
    let (a, b) = (operand(l)?, operand(r)?);
    Ok(match op {
        Plus => Value::Real(a + b),
        Minus => Value::Real(a - b),
        Multiply => Value::Real(a * b),
        Divide | Modulo if b == 0.0 => Value::Null,
        Divide => Value::Real(a / b),
        _ => Value::Real(a % b),
    })
}

/// Case-insensitive LIKE with `%` and `_` wildcards.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let t: Vec<char> = text.to_lowercase().chars().collect();
    // dp[j]: pattern prefix of length i matches text prefix of length j
    let mut dp = vec![false; t.len() + 1];
    dp[0] = true;
    for pc in &p {
        let mut next = vec![false; t.len() + 1];
        match pc {
            '%' => {
                let mut any = false;
                for j in 0..=t.len() {
                    any = any || dp[j];
                    next[j] = any;
                }
            }
            _ => {
                for j in 1..=t.len() {
                    next[j] = dp[j - 1] && (*pc == '_' || *pc == t[j - 1]);
                }
            }
        }
        dp = next;
    }
    dp[t.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::parse_expression;

    fn eval_on(sql: &str, names: &[&str], row: Vec<Value>) -> Value {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let scope = Scope::unqualified(&names);
        let ctx = RowContext { scope: &scope, row: &row };
        evaluate(&parse_expression(sql).unwrap(), &ctx).unwrap()
    }

    #[test]
    fn null_propagates_through_three_valued_logic() {
        assert_eq!(eval_on("a = 1", &["a"], vec![Value::Null]), Value::Null);
        assert_eq!(eval_on("a = 1 AND 1 = 0", &["a"], vec![Value::Null]), Value::Boolean(false));
        assert_eq!(eval_on("a = 1 OR 1 = 1", &["a"], vec![Value::Null]), Value::Boolean(true));
        assert_eq!(eval_on("NOT (a = 1)", &["a"], vec![Value::Null]), Value::Null);
        assert_eq!(eval_on("a IS NULL", &["a"], vec![Value::Null]), Value::Boolean(true));
    }

    #[test]
    fn integer_arithmetic_and_division() {
        assert_eq!(eval_on("7 / 2", &[], vec![]), Value::Integer(3));
        assert_eq!(eval_on("7 / 2.0", &[], vec![]), Value::Real(3.5));
        assert_eq!(eval_on("1 / 0", &[], vec![]), Value::Null);
        assert_eq!(eval_on("-a + 1", &["a"], vec![Value::Integer(4)]), Value::Integer(-3));
    }

    #[test]
    fn case_between_in_and_like() {
        assert_eq!(
            eval_on("CASE m WHEN '01' THEN 'Jan' WHEN '02' THEN 'Feb' END", &["m"], vec!["02".into()]),
            Value::text("Feb")
        );
        assert_eq!(eval_on("CASE WHEN a > 5 THEN 1 END", &["a"], vec![Value::Integer(3)]), Value::Null);
        assert_eq!(eval_on("a BETWEEN 1 AND 3", &["a"], vec![Value::Integer(3)]), Value::Boolean(true));
        assert_eq!(eval_on("a NOT IN (1, 2)", &["a"], vec![Value::Integer(3)]), Value::Boolean(true));
        assert_eq!(eval_on("a LIKE 'Cama%'", &["a"], vec!["cama_mesa_banho".into()]), Value::Boolean(true));
        assert!(!like_match("a_c", "abbc"));
    }

    #[test]
    fn qualified_resolution_detects_ambiguity() {
        let scope = Scope {
            columns: vec![
                ScopeColumn { qualifier: Some("o".into()), name: "order_id".into() },
                ScopeColumn { qualifier: Some("i".into()), name: "order_id".into() },
            ],
        };
        assert_eq!(scope.resolve(Some("i"), "order_id").unwrap(), 1);
        assert!(matches!(scope.resolve(None, "order_id"), Err(EtlError::AmbiguousColumn(_))));
        assert!(matches!(scope.resolve(Some("x"), "order_id"), Err(EtlError::ColumnNotFound(_))));
    }

    #[test]
    fn aggregates_outside_a_group_are_rejected() {
        let scope = Scope::default();
        let ctx = RowContext { scope: &scope, row: &[] };
        let expr = parse_expression("COUNT(*)").unwrap();
        assert!(matches!(evaluate(&expr, &ctx), Err(EtlError::InvalidValue(_))));
    }
}
