use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::trace;

use crate::catalog::Catalog;
use crate::error::{EtlError, EtlResult};
use crate::execution::eval::{evaluate, is_true, EvalContext, GroupContext, RowContext, Scope};
use crate::planner::aggregate::validate_select;
use crate::sql::ast::{BinaryOp, Expr, FromClause, Join, JoinKind, OrderByExpr, Select, SelectItem, TableFactor};
use crate::storage::table::Table;
use crate::storage::value::Value;

/// Intermediate rows together with their column layout.
#[derive(Debug, Clone)]
pub struct Relation {
    pub scope: Scope,
    pub rows: Vec<Vec<Value>>,
}

/// Source of an output row, used when ORDER BY names something that is
/// not part of the select list.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Row(usize),
    Group(usize),
    None,
}

pub fn execute_select(catalog: &Catalog, select: &Select) -> EtlResult<Table> {
    validate_select(select)?;

    let source = match &select.from {
        Some(from) => build_from(catalog, from)?,
        None => Relation { scope: Scope::default(), rows: vec![Vec::new()] },
    };
    let scope = source.scope;
    let rows = match &select.selection {
        Some(pred) => {
            let mut kept = Vec::new();
            for row in source.rows {
                if is_true(&evaluate(pred, &RowContext { scope: &scope, row: &row })?) {
                    kept.push(row);
                }
            }
            kept
        }
        None => source.rows,
    };
    trace!("{} rows after filtering", rows.len());

    let names = output_names(&select.projection, &scope)?;
    let mut output: Vec<(Vec<Value>, Anchor)> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    if select.is_grouped() {
        groups = group_rows(select, &scope, &rows)?;
        for (gi, members) in groups.iter().enumerate() {
            let refs: Vec<&[Value]> = members.iter().map(|&i| rows[i].as_slice()).collect();
            let ctx = GroupContext { scope: &scope, rows: &refs };
            if let Some(having) = &select.having {
                if !is_true(&evaluate(having, &ctx)?) {
                    continue;
                }
            }
            output.push((project(&select.projection, &scope, &ctx)?, Anchor::Group(gi)));
        }
    } else {
        for (i, row) in rows.iter().enumerate() {
            let ctx = RowContext { scope: &scope, row };
            output.push((project(&select.projection, &scope, &ctx)?, Anchor::Row(i)));
        }
    }

    if select.distinct {
        let mut seen = HashSet::new();
        output.retain(|(row, _)| seen.insert(row.iter().map(Value::join_key).collect::<Vec<_>>()));
        for (_, anchor) in output.iter_mut() {
            *anchor = Anchor::None;
        }
    }

    if !select.order_by.is_empty() {
        let out_scope = Scope::unqualified(&names);
        let mut keyed = Vec::with_capacity(output.len());
        for (row, anchor) in output {
            let mut keys = Vec::with_capacity(select.order_by.len());
            for item in &select.order_by {
                keys.push(sort_key(item, &row, anchor, &out_scope, &scope, &rows, &groups)?);
            }
            keyed.push((keys, row, anchor));
        }
        keyed.sort_by(|a, b| compare_keys(&a.0, &b.0, &select.order_by));
        output = keyed.into_iter().map(|(_, row, anchor)| (row, anchor)).collect();
    }

    let offset = select.offset.unwrap_or(0) as usize;
    let limit = select.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    let rows = output.into_iter().skip(offset).take(limit).map(|(row, _)| row).collect();
    Ok(Table::from_rows(names, rows))
}

fn build_from(catalog: &Catalog, from: &FromClause) -> EtlResult<Relation> {
    let mut relation = load_factor(catalog, &from.base)?;
    for join in &from.joins {
        let right = load_factor(catalog, &join.factor)?;
        relation = join_relations(relation, right, join)?;
    }
    Ok(relation)
}

fn load_factor(catalog: &Catalog, factor: &TableFactor) -> EtlResult<Relation> {
    let table = match factor {
        TableFactor::Named { name, .. } => catalog.get_table(name)?.clone(),
        TableFactor::Derived { subquery, .. } => execute_select(catalog, subquery)?,
    };
    Ok(Relation { scope: Scope::from_table(factor.qualifier(), &table), rows: table.rows })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Left,
    Right,
}

/// Which input of a join every column in `expr` comes from, if only one.
fn side_of(expr: &Expr, left: &Scope, right: &Scope) -> Option<Side> {
    let mut refs = Vec::new();
    collect_columns(expr, &mut refs);
    if refs.is_empty() {
        return None;
    }
    let mut side = None;
    for (table, name) in refs {
        let this = match (left.resolve(table, name).is_ok(), right.resolve(table, name).is_ok()) {
            (true, false) => Side::Left,
            (false, true) => Side::Right,
            _ => return None,
        };
        if side.is_some_and(|s| s != this) {
            return None;
        }
        side = Some(this);
    }
    side
}

fn collect_columns<'a>(expr: &'a Expr, out: &mut Vec<(Option<&'a str>, &'a str)>) {
    if let Expr::Column { table, name } = expr {
        out.push((table.as_deref(), name));
    }
    for child in expr.children() {
        collect_columns(child, out);
    }
}

fn join_relations(left: Relation, right: Relation, join: &Join) -> EtlResult<Relation> {
    let scope = left.scope.concat(&right.scope);
    let mut left_keys = Vec::new();
    let mut right_keys = Vec::new();
    let mut residual = Vec::new();
    for conjunct in join.on.conjuncts() {
        if let Expr::Binary { left: a, op: BinaryOp::Eq, right: b } = conjunct {
            match (side_of(a, &left.scope, &right.scope), side_of(b, &left.scope, &right.scope)) {
                (Some(Side::Left), Some(Side::Right)) => {
                    left_keys.push(&**a);
                    right_keys.push(&**b);
                    continue;
                }
                (Some(Side::Right), Some(Side::Left)) => {
                    left_keys.push(&**b);
                    right_keys.push(&**a);
                    continue;
                }
                _ => {}
            }
        }
        residual.push(conjunct);
    }

    let passes = |row: &[Value]| -> EtlResult<bool> {
        let ctx = RowContext { scope: &scope, row };
        for cond in &residual {
            if !is_true(&evaluate(cond, &ctx)?) {
                return Ok(false);
            }
        }
        Ok(true)
    };

    let width = right.scope.len();
    let mut rows = Vec::new();
    if left_keys.is_empty() {
        trace!("nested loop join on {}", join.on);
        for lrow in left.rows {
            let mut matched = false;
            for rrow in &right.rows {
                let mut combined = lrow.clone();
                combined.extend(rrow.iter().cloned());
                if passes(&combined)? {
                    rows.push(combined);
                    matched = true;
                }
            }
            if !matched && join.kind == JoinKind::Left {
                rows.push(pad_nulls(lrow, width));
            }
        }
    } else {
        trace!("hash join on {}", join.on);
        let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for (i, rrow) in right.rows.iter().enumerate() {
            if let Some(key) = join_key(&right_keys, &right.scope, rrow)? {
                index.entry(key).or_default().push(i);
            }
        }
        for lrow in left.rows {
            let mut matched = false;
            if let Some(key) = join_key(&left_keys, &left.scope, &lrow)? {
                for &ri in index.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
                    let mut combined = lrow.clone();
                    combined.extend(right.rows[ri].iter().cloned());
                    if passes(&combined)? {
                        rows.push(combined);
                        matched = true;
                    }
                }
            }
            if !matched && join.kind == JoinKind::Left {
                rows.push(pad_nulls(lrow, width));
            }
        }
    }
    Ok(Relation { scope, rows })
}

/// Key of one row for a hash join; `None` when any part is NULL.
fn join_key(exprs: &[&Expr], scope: &Scope, row: &[Value]) -> EtlResult<Option<Vec<Value>>> {
    let ctx = RowContext { scope, row };
    let mut key = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let v = evaluate(expr, &ctx)?;
        if v.is_null() {
            return Ok(None);
        }
        key.push(v.join_key());
    }
    Ok(Some(key))
}

fn pad_nulls(mut row: Vec<Value>, width: usize) -> Vec<Value> {
    row.extend(std::iter::repeat_n(Value::Null, width));
    row
}

fn output_names(projection: &[SelectItem], scope: &Scope) -> EtlResult<Vec<String>> {
    let mut names = Vec::new();
    for item in projection {
        match item {
            SelectItem::Wildcard => names.extend(scope.columns.iter().map(|c| c.name.clone())),
            SelectItem::QualifiedWildcard(q) => {
                let positions = qualified(scope, q)?;
                names.extend(positions.into_iter().map(|i| scope.columns[i].name.clone()));
            }
            SelectItem::Expr { .. } => names.extend(item.output_name()),
        }
    }
    Ok(names)
}

fn qualified(scope: &Scope, qualifier: &str) -> EtlResult<Vec<usize>> {
    let positions = scope.qualified_positions(qualifier);
    if positions.is_empty() {
        return Err(EtlError::TableNotFound(qualifier.to_string()));
    }
    Ok(positions)
}

fn project(projection: &[SelectItem], scope: &Scope, ctx: &dyn EvalContext) -> EtlResult<Vec<Value>> {
    let mut out = Vec::with_capacity(projection.len());
    for item in projection {
        match item {
            SelectItem::Wildcard => out.extend((0..scope.len()).map(|i| ctx.column_at(i))),
            SelectItem::QualifiedWildcard(q) => {
                out.extend(qualified(scope, q)?.into_iter().map(|i| ctx.column_at(i)));
            }
            SelectItem::Expr { expr, .. } => out.push(evaluate(expr, ctx)?),
        }
    }
    Ok(out)
}

/// Bucket filtered rows by their GROUP BY key, ordered by key.
fn group_rows(select: &Select, scope: &Scope, rows: &[Vec<Value>]) -> EtlResult<Vec<Vec<usize>>> {
    if select.group_by.is_empty() {
        return Ok(vec![(0..rows.len()).collect()]);
    }
    let exprs: Vec<Expr> = select
        .group_by
        .iter()
        .map(|e| resolve_alias(e, &select.projection, scope))
        .collect();
    let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let ctx = RowContext { scope, row };
        let key = exprs
            .iter()
            .map(|e| evaluate(e, &ctx).map(|v| v.join_key()))
            .collect::<EtlResult<Vec<_>>>()?;
        match positions.get(&key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![i]));
            }
        }
    }
    groups.sort_by(|a, b| {
        a.0.iter()
            .zip(b.0.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    Ok(groups.into_iter().map(|(_, members)| members).collect())
}

/// A bare GROUP BY name that is not a source column may refer to a select
/// list alias.
fn resolve_alias(expr: &Expr, projection: &[SelectItem], scope: &Scope) -> Expr {
    if let Expr::Column { table: None, name } = expr {
        if scope.resolve(None, name).is_err() {
            for item in projection {
                if let SelectItem::Expr { expr: target, alias: Some(alias) } = item {
                    if alias.eq_ignore_ascii_case(name) {
                        return target.clone();
                    }
                }
            }
        }
    }
    expr.clone()
}

fn sort_key(
    item: &OrderByExpr,
    out_row: &[Value],
    anchor: Anchor,
    out_scope: &Scope,
    scope: &Scope,
    rows: &[Vec<Value>],
    groups: &[Vec<usize>],
) -> EtlResult<Value> {
    if let Expr::Literal(Value::Integer(pos)) = &item.expr {
        return usize::try_from(*pos)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|p| out_row.get(p).cloned())
            .ok_or_else(|| EtlError::InvalidValue(format!("ORDER BY position {} is out of range", pos)));
    }
    let by_output = evaluate(&item.expr, &RowContext { scope: out_scope, row: out_row });
    match (by_output, anchor) {
        (Ok(v), _) => Ok(v),
        (Err(_), Anchor::Row(i)) => evaluate(&item.expr, &RowContext { scope, row: &rows[i] }),
        (Err(_), Anchor::Group(g)) => {
            let refs: Vec<&[Value]> = groups[g].iter().map(|&i| rows[i].as_slice()).collect();
            evaluate(&item.expr, &GroupContext { scope, rows: &refs })
        }
        (Err(e), Anchor::None) => Err(e),
    }
}

fn compare_keys(a: &[Value], b: &[Value], order_by: &[OrderByExpr]) -> Ordering {
    for ((x, y), item) in a.iter().zip(b.iter()).zip(order_by) {
        let ord = x.total_cmp(y);
        let ord = if item.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
