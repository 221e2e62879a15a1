use std::path::PathBuf;

use indexmap::IndexMap;

pub const DEFAULT_HOLIDAYS_URL: &str = "https://date.nager.at/api/v3/PublicHolidays";
pub const DEFAULT_YEAR: i32 = 2017;
pub const DEFAULT_COUNTRY: &str = "BR";

/// File name the downloaded dataset archive is stored under.
pub const DATASET_ARCHIVE: &str = "olist_dataset.zip";

/// Raw CSV files of the Olist dataset.
pub const DATASET_FILES: &[&str] = &[
    "olist_customers_dataset.csv",
    "olist_geolocation_dataset.csv",
    "olist_order_items_dataset.csv",
    "olist_order_payments_dataset.csv",
    "olist_order_reviews_dataset.csv",
    "olist_orders_dataset.csv",
    "olist_products_dataset.csv",
    "olist_sellers_dataset.csv",
    "product_category_name_translation.csv",
];

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the archive and the extracted CSV files live.
    pub data_dir: PathBuf,
    /// Archive to download when it is not already in `data_dir`.
    pub dataset_url: Option<String>,
    pub holidays_url: String,
    pub year: i32,
    pub country: String,
    /// Read SQL assets from here instead of the bundled ones.
    pub queries_dir: Option<PathBuf>,
    /// Export every result table as CSV into this directory.
    pub output_dir: Option<PathBuf>,
    /// CSV file name to table name.
    pub csv_table_mapping: IndexMap<String, String>,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            dataset_url: None,
            holidays_url: DEFAULT_HOLIDAYS_URL.to_string(),
            year: DEFAULT_YEAR,
            country: DEFAULT_COUNTRY.to_string(),
            queries_dir: None,
            output_dir: None,
            csv_table_mapping: default_csv_table_mapping(),
        }
    }

    pub fn dataset_archive(&self) -> PathBuf {
        self.data_dir.join(DATASET_ARCHIVE)
    }
}

/// Table name for a raw CSV file: `olist_orders_dataset.csv` becomes
/// `olist_orders`.
pub fn table_name_for(file: &str) -> String {
    file.strip_suffix("_dataset.csv")
        .or_else(|| file.strip_suffix(".csv"))
        .unwrap_or(file)
        .to_string()
}

pub fn default_csv_table_mapping() -> IndexMap<String, String> {
    DATASET_FILES
        .iter()
        .map(|file| (file.to_string(), table_name_for(file)))
        .collect()
}
