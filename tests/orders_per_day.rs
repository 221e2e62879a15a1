mod common;

use common::{date, holidays, olist_engine, t, table};
use olist_etl::transform::orders_per_day::orders_per_day_and_holidays_2017;
use olist_etl::{ColumnType, Engine, EtlError, Value};

fn engine(purchases: Vec<Value>, holiday_table: olist_etl::Table) -> Engine {
    let mut engine = Engine::new();
    engine.write_table(
        "olist_orders",
        table(
            &["order_id", "order_purchase_timestamp"],
            purchases
                .into_iter()
                .enumerate()
                .map(|(i, ts)| vec![t(&format!("o{}", i)), ts])
                .collect(),
        ),
    );
    engine.write_table("public_holidays", holiday_table);
    engine
}

#[test]
fn counts_2017_orders_per_day_and_flags_holidays() {
    let engine = engine(
        vec![
            t("2017-01-01T08:00"),
            t("2017-01-01T23:00"),
            t("2017-01-02T10:00"),
            t("2016-12-31T10:00"),
        ],
        holidays(&[date(2017, 1, 1)]),
    );
    let result = orders_per_day_and_holidays_2017(&engine).unwrap();
    assert_eq!(result.column_names(), vec!["order_count", "date", "holiday"]);
    let types: Vec<ColumnType> = result.columns.iter().map(|c| c.ty).collect();
    assert_eq!(types, vec![ColumnType::Integer, ColumnType::Date, ColumnType::Boolean]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Integer(2), Value::Date(date(2017, 1, 1)), Value::Boolean(true)],
            vec![Value::Integer(1), Value::Date(date(2017, 1, 2)), Value::Boolean(false)],
        ]
    );
}

#[test]
fn unparseable_purchase_timestamps_are_left_out() {
    let engine = engine(
        vec![t("2017-03-04 10:00:00"), t("not a date"), Value::Null, t("2017-03-04")],
        holidays(&[]),
    );
    let result = orders_per_day_and_holidays_2017(&engine).unwrap();
    assert_eq!(
        result.rows,
        vec![vec![Value::Integer(2), Value::Date(date(2017, 3, 4)), Value::Boolean(false)]]
    );
}

#[test]
fn unparseable_holiday_date_is_a_parse_error() {
    let engine = engine(
        vec![t("2017-03-04 10:00:00")],
        table(&["date"], vec![vec![t("tomorrow")]]),
    );
    assert!(matches!(
        orders_per_day_and_holidays_2017(&engine),
        Err(EtlError::ParseError(_))
    ));
}

#[test]
fn olist_fixture_days() {
    let result = orders_per_day_and_holidays_2017(&olist_engine()).unwrap();
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Integer(2), Value::Date(date(2017, 1, 1)), Value::Boolean(true)],
            vec![Value::Integer(1), Value::Date(date(2017, 1, 2)), Value::Boolean(false)],
        ]
    );
}
