use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use olist_etl::config::{table_name_for, Config};
use olist_etl::extract::{ensure_datasets_available, read_csv_table, read_raw_tables, write_csv_table};
use olist_etl::load::load;
use olist_etl::{ColumnType, Engine, EtlError, Store, Table, Value};
use zip::write::SimpleFileOptions;

const ORDERS_CSV: &str = "order_id,order_status,order_purchase_timestamp\n\
                          o1,delivered,2017-01-01 08:00:00\n\
                          o2,shipped,\n";
const ITEMS_CSV: &str = "order_id,product_id,freight_value\n\
                         o1,p1,10.5\n\
                         o1,p2,3\n";

fn build_archive(path: &Path, members: &[(&str, &str)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn config_for(dir: &Path) -> Config {
    let mut config = Config::new(dir);
    config.csv_table_mapping = ["olist_orders_dataset.csv", "olist_order_items_dataset.csv"]
        .iter()
        .map(|f| (f.to_string(), table_name_for(f)))
        .collect();
    config
}

#[test]
fn acquisition_extracts_missing_members_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    build_archive(
        &config.dataset_archive(),
        &[
            ("dataset/olist_orders_dataset.csv", ORDERS_CSV),
            ("dataset/olist_order_items_dataset.csv", ITEMS_CSV),
            ("dataset/olist_sellers_dataset.csv", "seller_id\ns1\n"),
        ],
    );

    ensure_datasets_available(&config).unwrap();
    let orders = dir.path().join("olist_orders_dataset.csv");
    assert_eq!(fs::read_to_string(&orders).unwrap(), ORDERS_CSV);
    assert!(!dir.path().join("olist_sellers_dataset.csv").exists());

    // files already on disk are never rewritten, and no archive is needed
    fs::write(&orders, "order_id\nlocal\n").unwrap();
    fs::remove_file(config.dataset_archive()).unwrap();
    ensure_datasets_available(&config).unwrap();
    assert_eq!(fs::read_to_string(&orders).unwrap(), "order_id\nlocal\n");
}

#[test]
fn acquisition_needs_a_url_when_the_archive_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    assert!(matches!(ensure_datasets_available(&config), Err(EtlError::Config(_))));
}

#[test]
fn acquisition_reports_members_missing_from_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    build_archive(&config.dataset_archive(), &[("olist_orders_dataset.csv", ORDERS_CSV)]);
    let err = ensure_datasets_available(&config).unwrap_err();
    assert!(matches!(err, EtlError::Config(msg) if msg.contains("olist_order_items_dataset.csv")));
}

#[test]
fn raw_tables_load_under_mapped_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("olist_orders_dataset.csv"), ORDERS_CSV).unwrap();
    fs::write(dir.path().join("olist_order_items_dataset.csv"), ITEMS_CSV).unwrap();
    let config = config_for(dir.path());

    let tables = read_raw_tables(dir.path(), &config.csv_table_mapping).unwrap();
    let names: Vec<&str> = tables.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["olist_orders", "olist_order_items"]);

    let mut engine = Engine::new();
    load(tables, &mut engine);
    let orders = engine.read_table("olist_orders").unwrap();
    assert_eq!(orders.rows[1][2], Value::Null);
    let items = engine.read_table("olist_order_items").unwrap();
    assert_eq!(items.columns[2].ty, ColumnType::Real);

    // loading again replaces rather than appends
    let mut again = IndexMap::new();
    again.insert("olist_orders".to_string(), read_csv_table(&dir.path().join("olist_orders_dataset.csv")).unwrap());
    load(again, &mut engine);
    assert_eq!(engine.read_table("olist_orders").unwrap().num_rows(), 2);
}

#[test]
fn csv_export_reads_back_with_the_same_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let table = Table::from_rows(
        vec!["state".into(), "orders".into(), "revenue".into(), "note".into()],
        vec![
            vec![Value::text("SP"), Value::Integer(2), Value::Real(197.5), Value::Null],
            vec![Value::text("RJ"), Value::Integer(1), Value::Real(108.25), Value::text("a,b")],
        ],
    );
    write_csv_table(&path, &table).unwrap();
    let back = read_csv_table(&path).unwrap();
    assert_eq!(back, table);
}
