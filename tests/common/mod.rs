#![allow(dead_code)]

use chrono::NaiveDate;
use olist_etl::{Engine, Table, Value};

pub fn t(s: &str) -> Value {
    Value::text(s)
}

pub fn table(names: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::from_rows(names.iter().map(|n| n.to_string()).collect(), rows)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn holidays(dates: &[NaiveDate]) -> Table {
    table(
        &["date", "localName", "name", "countryCode"],
        dates
            .iter()
            .map(|d| vec![Value::DateTime(d.and_hms_opt(0, 0, 0).unwrap()), t("feriado"), t("holiday"), t("BR")])
            .collect(),
    )
}

/// A small store shaped like the Olist dataset.
///
/// Delivered orders: o1 (SP), o2 (RJ), o4 (SP, bought in 2016). o3 is
/// still in transit. 2017-01-01 is a holiday.
pub fn olist_engine() -> Engine {
    let mut engine = Engine::new();
    engine.write_table(
        "olist_orders",
        table(
            &[
                "order_id",
                "customer_id",
                "order_status",
                "order_purchase_timestamp",
                "order_delivered_customer_date",
                "order_estimated_delivery_date",
            ],
            vec![
                vec![t("o1"), t("c1"), t("delivered"), t("2017-01-01 08:00:00"), t("2017-01-05 10:00:00"), t("2017-01-10 00:00:00")],
                vec![t("o2"), t("c2"), t("delivered"), t("2017-01-01 23:00:00"), t("2017-01-12 09:00:00"), t("2017-01-10 00:00:00")],
                vec![t("o3"), t("c1"), t("shipped"), t("2017-01-02 10:00:00"), Value::Null, t("2017-01-20 00:00:00")],
                vec![t("o4"), t("c3"), t("delivered"), t("2016-12-31 10:00:00"), t("2017-01-03 12:00:00"), t("2017-01-08 00:00:00")],
            ],
        ),
    );
    engine.write_table(
        "olist_customers",
        table(
            &["customer_id", "customer_state"],
            vec![vec![t("c1"), t("SP")], vec![t("c2"), t("RJ")], vec![t("c3"), t("SP")]],
        ),
    );
    engine.write_table(
        "olist_order_items",
        table(
            &["order_id", "order_item_id", "product_id", "price", "freight_value"],
            vec![
                vec![t("o1"), Value::Integer(1), t("p1"), Value::Real(100.0), Value::Real(10.0)],
                vec![t("o1"), Value::Integer(2), t("p2"), Value::Real(50.0), Value::Real(5.0)],
                vec![t("o2"), Value::Integer(1), t("p1"), Value::Real(100.0), Value::Real(8.0)],
                vec![t("o3"), Value::Integer(1), t("p2"), Value::Real(50.0), Value::Real(4.0)],
                vec![t("o4"), Value::Integer(1), t("p3"), Value::Real(30.0), Value::Real(2.5)],
            ],
        ),
    );
    engine.write_table(
        "olist_products",
        table(
            &["product_id", "product_category_name", "product_weight_g"],
            vec![
                vec![t("p1"), t("cama_mesa_banho"), Value::Integer(100)],
                vec![t("p2"), t("esporte_lazer"), Value::Integer(50)],
                vec![t("p3"), Value::Null, Value::Integer(200)],
            ],
        ),
    );
    engine.write_table(
        "product_category_name_translation",
        table(
            &["product_category_name", "product_category_name_english"],
            vec![
                vec![t("cama_mesa_banho"), t("bed_bath_table")],
                vec![t("esporte_lazer"), t("sports_leisure")],
            ],
        ),
    );
    engine.write_table(
        "olist_order_payments",
        table(
            &["order_id", "payment_sequential", "payment_type", "payment_value"],
            vec![
                vec![t("o1"), Value::Integer(1), t("credit_card"), Value::Real(165.0)],
                vec![t("o2"), Value::Integer(1), t("boleto"), Value::Real(108.0)],
                vec![t("o3"), Value::Integer(1), t("voucher"), Value::Real(54.0)],
                vec![t("o4"), Value::Integer(1), t("credit_card"), Value::Real(32.5)],
            ],
        ),
    );
    engine.write_table("public_holidays", holidays(&[date(2017, 1, 1)]));
    engine
}
