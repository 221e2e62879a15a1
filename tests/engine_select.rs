mod common;

use common::{olist_engine, t, table};
use olist_etl::{ColumnType, Engine, EtlError, Store, Value};

fn scores() -> Engine {
    let mut engine = Engine::new();
    engine.write_table(
        "matches",
        table(
            &["id", "team", "league", "score"],
            vec![
                vec![Value::Integer(1), t("a"), t("l1"), Value::Integer(10)],
                vec![Value::Integer(2), t("a"), t("l2"), Value::Integer(20)],
                vec![Value::Integer(3), t("b"), t("l1"), Value::Integer(15)],
                vec![Value::Integer(4), t("c"), t("l2"), Value::Null],
            ],
        ),
    );
    engine
}

#[test]
fn group_by_with_having_and_aggregates() {
    let engine = scores();
    let result = engine
        .submit("SELECT team, SUM(score) AS total, COUNT(score), AVG(score) FROM matches GROUP BY team HAVING COUNT(*) > 1")
        .unwrap();
    assert_eq!(result.column_names(), vec!["team", "total", "COUNT(score)", "AVG(score)"]);
    assert_eq!(
        result.rows,
        vec![vec![t("a"), Value::Integer(30), Value::Integer(2), Value::Real(15.0)]]
    );
}

#[test]
fn grouping_orders_groups_and_keeps_null_sums() {
    let engine = scores();
    let result = engine
        .submit("SELECT team, SUM(score) FROM matches GROUP BY team")
        .unwrap();
    assert_eq!(result.num_rows(), 3);
    assert_eq!(result.rows[2], vec![t("c"), Value::Null]);
    assert_eq!(result.columns[1].ty, ColumnType::Integer);
}

#[test]
fn order_by_position_desc_with_limit_offset() {
    let engine = scores();
    let result = engine
        .submit("SELECT id, score FROM matches WHERE score IS NOT NULL ORDER BY 2 DESC LIMIT 2 OFFSET 1")
        .unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Integer(3), Value::Integer(15)],
            vec![Value::Integer(1), Value::Integer(10)],
        ]
    );
}

#[test]
fn nulls_sort_first() {
    let engine = scores();
    let result = engine.submit("SELECT score FROM matches ORDER BY score").unwrap();
    assert_eq!(result.rows[0], vec![Value::Null]);
    assert_eq!(result.rows[3], vec![Value::Integer(20)]);
}

#[test]
fn case_cast_and_string_functions() {
    let engine = scores();
    let result = engine
        .submit(
            "SELECT upper(team) || '-' || league AS tag, \
                    CASE WHEN score >= 15 THEN 'high' WHEN score IS NULL THEN 'none' ELSE 'low' END AS band, \
                    CAST(score / 4 AS REAL) AS quarter \
             FROM matches ORDER BY id",
        )
        .unwrap();
    assert_eq!(result.rows[0], vec![t("A-l1"), t("low"), Value::Real(2.0)]);
    assert_eq!(result.rows[1], vec![t("A-l2"), t("high"), Value::Real(5.0)]);
    assert_eq!(result.rows[3], vec![t("C-l2"), t("none"), Value::Null]);
}

#[test]
fn date_functions_follow_sqlite() {
    let engine = olist_engine();
    let result = engine
        .submit(
            "SELECT order_id, strftime('%Y-%m', order_purchase_timestamp) AS ym, \
                    date(order_purchase_timestamp) AS d, \
                    julianday(order_estimated_delivery_date) - julianday('2017-01-01') AS days \
             FROM olist_orders WHERE order_id IN ('o1', 'o4') ORDER BY order_id",
        )
        .unwrap();
    assert_eq!(result.rows[0], vec![t("o1"), t("2017-01"), t("2017-01-01"), Value::Real(9.0)]);
    assert_eq!(result.rows[1], vec![t("o4"), t("2016-12"), t("2016-12-31"), Value::Real(7.0)]);
}

#[test]
fn three_way_join_with_aliases() {
    let engine = olist_engine();
    let result = engine
        .submit(
            "SELECT o.order_id, c.customer_state, SUM(i.freight_value) AS freight \
             FROM olist_orders AS o \
             INNER JOIN olist_customers AS c ON c.customer_id = o.customer_id \
             JOIN olist_order_items i ON i.order_id = o.order_id \
             GROUP BY o.order_id ORDER BY freight DESC",
        )
        .unwrap();
    assert_eq!(result.rows[0], vec![t("o1"), t("SP"), Value::Real(15.0)]);
    assert_eq!(result.num_rows(), 4);
}

#[test]
fn left_join_keeps_unmatched_rows() {
    let engine = olist_engine();
    let result = engine
        .submit(
            "SELECT p.product_id, tr.product_category_name_english \
             FROM olist_products p \
             LEFT OUTER JOIN product_category_name_translation tr \
                 ON tr.product_category_name = p.product_category_name \
             ORDER BY p.product_id",
        )
        .unwrap();
    assert_eq!(result.rows[2], vec![t("p3"), Value::Null]);
}

#[test]
fn join_on_non_equality_uses_nested_loop() {
    let engine = scores();
    let result = engine
        .submit(
            "SELECT a.id, b.id FROM matches a JOIN matches b ON a.score < b.score ORDER BY a.id, b.id",
        )
        .unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Integer(1), Value::Integer(2)],
            vec![Value::Integer(1), Value::Integer(3)],
            vec![Value::Integer(3), Value::Integer(2)],
        ]
    );
}

#[test]
fn select_without_from() {
    let engine = Engine::new();
    let result = engine.submit("SELECT 1 + 2 AS three, 'x' AS letter;").unwrap();
    assert_eq!(result.rows, vec![vec![Value::Integer(3), t("x")]]);
}

#[test]
fn extreme_integer_arguments_stay_in_range() {
    let engine = Engine::new();
    let result = engine
        .submit("SELECT ABS(-9223372036854775807 - 1) AS a, SUBSTR('abc', -99999999999999999999.0, 5) AS s")
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::Real(9_223_372_036_854_775_808.0), t("")]]);
}

#[test]
fn store_errors() {
    let engine = scores();
    assert!(matches!(engine.submit("DELETE FROM matches"), Err(EtlError::Unsupported(_))));
    assert!(matches!(engine.submit("SELECT FROM"), Err(EtlError::ParseError(_))));
    assert!(matches!(engine.submit("SELECT nope(id) FROM matches"), Err(EtlError::UnknownFunction(_))));
    assert!(matches!(
        engine.submit("SELECT id FROM matches a JOIN matches b ON a.id = b.id"),
        Err(EtlError::AmbiguousColumn(_))
    ));
    assert!(matches!(
        engine.submit("SELECT team FROM matches WHERE COUNT(*) > 1"),
        Err(EtlError::InvalidValue(_))
    ));
    assert!(matches!(engine.read_table("nope"), Err(EtlError::TableNotFound(_))));
}

#[test]
fn write_table_overwrites() {
    let mut engine = scores();
    engine.write_table("matches", table(&["x"], vec![vec![Value::Integer(1)]]));
    assert_eq!(engine.read_table("matches").unwrap().column_names(), vec!["x"]);
    assert_eq!(engine.table_names(), vec!["matches".to_string()]);
}
