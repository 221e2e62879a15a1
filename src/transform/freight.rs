use std::collections::HashMap;

use log::debug;

use crate::engine::Store;
use crate::error::{EtlError, EtlResult};
use crate::storage::table::{Column, Table};
use crate::storage::value::{ColumnType, Value};
use crate::transform::{ORDERS, ORDER_ITEMS, PRODUCTS};

/// Total freight value and total product weight of every delivered order.
///
/// Orders join items one-to-many and items join products many-to-one. A
/// duplicate key on the "one" side or an item pointing at a missing order or
/// product is an integrity violation, so each join yields exactly one row per
/// order item. Items with a NULL order id drop out of the grouping.
pub fn freight_value_weight_relationship(store: &dyn Store) -> EtlResult<Table> {
    let orders = store.read_table(ORDERS)?;
    let items = store.read_table(ORDER_ITEMS)?;
    let products = store.read_table(PRODUCTS)?;

    let status_by_order = unique_lookup(&orders, ORDERS, "order_id", "order_status")?;
    let weight_by_product = unique_lookup(&products, PRODUCTS, "product_id", "product_weight_g")?;

    let item_order = items.column_index("order_id")?;
    let item_product = items.column_index("product_id")?;
    let item_freight = items.column_index("freight_value")?;

    // items x orders
    let mut with_orders = Vec::with_capacity(items.num_rows());
    for row in &items.rows {
        let order_id = &row[item_order];
        let status = status_by_order.get(&order_id.join_key()).ok_or_else(|| {
            EtlError::IntegrityViolation(format!("order item references unknown order '{}'", order_id))
        })?;
        with_orders.push((row, *status));
    }

    // (items x orders) x products
    let mut joined = Vec::with_capacity(with_orders.len());
    for (row, status) in with_orders {
        let product_id = &row[item_product];
        let weight = weight_by_product.get(&product_id.join_key()).ok_or_else(|| {
            EtlError::IntegrityViolation(format!(
                "order item references unknown product '{}'",
                product_id
            ))
        })?;
        joined.push((row, status, *weight));
    }

    let mut positions: HashMap<Value, usize> = HashMap::new();
    let mut totals: Vec<(Value, f64, f64)> = Vec::new();
    for (row, status, weight) in joined {
        if !matches!(status, Value::Text(s) if &**s == "delivered") {
            continue;
        }
        let order_id = &row[item_order];
        if order_id.is_null() {
            continue;
        }
        let slot = *positions.entry(order_id.join_key()).or_insert_with(|| {
            totals.push((order_id.clone(), 0.0, 0.0));
            totals.len() - 1
        });
        totals[slot].1 += numeric_or_zero(&row[item_freight], "freight_value")?;
        totals[slot].2 += numeric_or_zero(weight, "product_weight_g")?;
    }
    totals.sort_by(|a, b| a.0.total_cmp(&b.0));
    debug!("{} delivered orders with freight totals", totals.len());

    let mut out = Table::new(vec![
        Column::new("order_id", ColumnType::Null),
        Column::new("freight_value", ColumnType::Real),
        Column::new("product_weight_g", ColumnType::Real),
    ]);
    for (order_id, freight, weight) in totals {
        out.push_row(vec![order_id, Value::Real(freight), Value::Real(weight)])?;
    }
    Ok(out)
}

/// Map each `key` of `table` to its `value` column, rejecting duplicate keys.
fn unique_lookup<'a>(
    table: &'a Table,
    table_name: &str,
    key: &str,
    value: &str,
) -> EtlResult<HashMap<Value, &'a Value>> {
    let key_idx = table.column_index(key)?;
    let value_idx = table.column_index(value)?;
    let mut lookup = HashMap::with_capacity(table.num_rows());
    for row in &table.rows {
        if lookup.insert(row[key_idx].join_key(), &row[value_idx]).is_some() {
            return Err(EtlError::IntegrityViolation(format!(
                "duplicate {} '{}' in {}",
                key, row[key_idx], table_name
            )));
        }
    }
    Ok(lookup)
}

/// Sums skip NULLs.
fn numeric_or_zero(v: &Value, column: &str) -> EtlResult<f64> {
    if v.is_null() {
        return Ok(0.0);
    }
    v.as_f64()
        .ok_or_else(|| EtlError::InvalidValue(format!("{} is not numeric: '{}'", column, v)))
}
