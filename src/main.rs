// src/main.rs

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use olist_etl::config::{Config, DEFAULT_COUNTRY, DEFAULT_HOLIDAYS_URL, DEFAULT_YEAR};
use olist_etl::extract::{ensure_datasets_available, extract, write_csv_table};
use olist_etl::load::load;
use olist_etl::transform::{Pipeline, QueryDir, Resolver};
use olist_etl::Engine;

/// Load the Olist e-commerce dataset and produce the analytical tables.
#[derive(Parser, Debug)]
#[command(name = "etl", version)]
struct Args {
    /// Directory holding the dataset archive and the extracted CSV files.
    #[arg(long, default_value = "dataset", env = "ETL_DATA_DIR")]
    data_dir: PathBuf,

    /// Where to download the dataset archive from when it is not on disk.
    #[arg(long, env = "ETL_DATASET_URL")]
    dataset_url: Option<String>,

    /// Base URL of the public holiday API.
    #[arg(long, default_value = DEFAULT_HOLIDAYS_URL, env = "ETL_HOLIDAYS_URL")]
    holidays_url: String,

    /// Year to fetch public holidays for.
    #[arg(long, default_value_t = DEFAULT_YEAR, env = "ETL_YEAR")]
    year: i32,

    /// Country code to fetch public holidays for.
    #[arg(long, default_value = DEFAULT_COUNTRY, env = "ETL_COUNTRY")]
    country: String,

    /// Read query definitions from this directory instead of the built-in ones.
    #[arg(long, env = "ETL_QUERIES_DIR")]
    queries_dir: Option<PathBuf>,

    /// Export every result table as `<name>.csv` into this directory.
    #[arg(long, env = "ETL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut config = Config::new(args.data_dir);
        config.dataset_url = args.dataset_url;
        config.holidays_url = args.holidays_url;
        config.year = args.year;
        config.country = args.country;
        config.queries_dir = args.queries_dir;
        config.output_dir = args.output_dir;
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from(Args::parse());

    ensure_datasets_available(&config).context("acquiring the dataset")?;

    let tables = extract(
        &config.data_dir,
        &config.csv_table_mapping,
        &config.holidays_url,
        config.year,
        &config.country,
    )
    .context("extracting raw tables")?;

    let mut engine = Engine::new();
    load(tables, &mut engine);

    let resolver = match &config.queries_dir {
        Some(dir) => Resolver::new(QueryDir::new(dir)),
        None => Resolver::bundled(),
    };
    let results = Pipeline::new(resolver)
        .run_all(&engine)
        .context("running the query catalog")?;

    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    for (name, table) in results {
        if let Some(dir) = &config.output_dir {
            let path = dir.join(format!("{}.csv", name));
            write_csv_table(&path, &table).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        println!("{}: {} rows", name, table.num_rows());
        engine.write_table(&name, table);
    }
    info!("engine holds {} tables", engine.table_names().len());
    Ok(())
}
