//! Catalog of analytical queries and the pipeline that runs them.

pub mod freight;
pub mod orders_per_day;
pub mod query_id;
pub mod resolver;

use indexmap::IndexMap;
use log::info;

use crate::engine::Store;
use crate::error::{EtlError, EtlResult};
use crate::storage::table::Table;

pub use query_id::{QueryId, Strategy};
pub use resolver::{BundledQueries, QueryDir, QuerySource, QueryText, Resolver};

pub const ORDERS: &str = "olist_orders";
pub const ORDER_ITEMS: &str = "olist_order_items";
pub const ORDER_PAYMENTS: &str = "olist_order_payments";
pub const PRODUCTS: &str = "olist_products";
pub const CUSTOMERS: &str = "olist_customers";
pub const CATEGORY_TRANSLATION: &str = "product_category_name_translation";
pub const PUBLIC_HOLIDAYS: &str = "public_holidays";

/// One named output table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub name: QueryId,
    pub result: Table,
}

/// Every output table of a run, keyed by query name in catalog order.
pub type ResultSet = IndexMap<String, Table>;

/// Produce the result of a single query.
pub fn execute(id: QueryId, resolver: &Resolver, store: &dyn Store) -> EtlResult<QueryResult> {
    let result = match id.strategy() {
        Strategy::PassThrough => match resolver.resolve(id)? {
            QueryText::Sql(sql) => store.submit(&sql)?,
            QueryText::Procedural => return Err(EtlError::QueryNotFound(id.as_str().to_string())),
        },
        Strategy::Computed(compute) => compute(store)?,
    };
    Ok(QueryResult { name: id, result })
}

#[derive(Default)]
pub struct Pipeline {
    resolver: Resolver,
}

impl Pipeline {
    pub fn new(resolver: Resolver) -> Self {
        Pipeline { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Run every query in catalog order. The first failure aborts the run.
    pub fn run_all(&self, store: &dyn Store) -> EtlResult<ResultSet> {
        let mut results = ResultSet::with_capacity(QueryId::list_all().len());
        for id in QueryId::list_all() {
            let QueryResult { name, result } = execute(*id, &self.resolver, store)?;
            info!("{}: {} rows", name, result.num_rows());
            results.insert(name.as_str().to_string(), result);
        }
        Ok(results)
    }
}

/// Run the catalog with the bundled SQL assets.
pub fn run_queries(store: &dyn Store) -> EtlResult<ResultSet> {
    Pipeline::default().run_all(store)
}
