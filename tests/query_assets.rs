mod common;

use common::{olist_engine, t};
use olist_etl::{run_queries, Value};

#[test]
fn order_status_counts() {
    let results = run_queries(&olist_engine()).unwrap();
    let table = &results["global_ammount_order_status"];
    assert_eq!(table.column_names(), vec!["order_status", "Ammount"]);
    assert_eq!(
        table.rows,
        vec![
            vec![t("delivered"), Value::Integer(3)],
            vec![t("shipped"), Value::Integer(1)],
        ]
    );
}

#[test]
fn revenue_per_state_ranks_delivered_revenue() {
    let results = run_queries(&olist_engine()).unwrap();
    let table = &results["revenue_per_state"];
    assert_eq!(table.column_names(), vec!["customer_state", "Revenue"]);
    assert_eq!(
        table.rows,
        vec![vec![t("SP"), Value::Real(197.5)], vec![t("RJ"), Value::Real(108.0)]]
    );
}

#[test]
fn delivery_date_difference_in_whole_days() {
    let results = run_queries(&olist_engine()).unwrap();
    let table = &results["delivery_date_difference"];
    assert_eq!(table.column_names(), vec!["State", "Delivery_Difference"]);
    assert_eq!(
        table.rows,
        vec![vec![t("RJ"), Value::Integer(-2)], vec![t("SP"), Value::Integer(5)]]
    );
}

#[test]
fn category_rankings() {
    let results = run_queries(&olist_engine()).unwrap();
    let top = &results["top_10_revenue_categories"];
    assert_eq!(top.column_names(), vec!["Category", "Num_order", "Revenue"]);
    assert_eq!(
        top.rows,
        vec![
            vec![t("bed_bath_table"), Value::Integer(2), Value::Real(273.0)],
            vec![t("sports_leisure"), Value::Integer(1), Value::Real(165.0)],
        ]
    );
    let least = &results["top_10_least_revenue_categories"];
    assert_eq!(least.rows[0][0], t("sports_leisure"));
    assert_eq!(least.rows[1][0], t("bed_bath_table"));
}

#[test]
fn revenue_by_month_pivots_years() {
    let results = run_queries(&olist_engine()).unwrap();
    let table = &results["revenue_by_month_year"];
    assert_eq!(
        table.column_names(),
        vec!["month_no", "month", "Year2016", "Year2017", "Year2018"]
    );
    assert_eq!(
        table.rows,
        vec![vec![t("01"), t("Jan"), Value::Real(0.0), Value::Real(305.5), Value::Real(0.0)]]
    );
}

#[test]
fn real_vs_estimated_by_purchase_month() {
    let results = run_queries(&olist_engine()).unwrap();
    let table = &results["real_vs_estimated_delivered_time"];
    assert_eq!(table.num_columns(), 8);
    let months: Vec<&Value> = table.column("month").unwrap();
    assert_eq!(months, vec![&t("Jan"), &t("Dec")]);

    // o4 was bought on 2016-12-31 10:00 and delivered 2017-01-03 12:00
    let real_2016 = table.column("Year2016_real_time").unwrap();
    assert_eq!(real_2016[0], &Value::Null);
    let days = real_2016[1].as_f64().unwrap();
    assert!((days - (3.0 + 2.0 / 24.0)).abs() < 1e-6);

    let estimated_2017 = table.column("Year2017_estimated_time").unwrap();
    let avg = estimated_2017[0].as_f64().unwrap();
    // (8d 16h + 8d 1h) / 2
    assert!((avg - (8.0 + 16.0 / 24.0 + 8.0 + 1.0 / 24.0) / 2.0).abs() < 1e-6);
}
