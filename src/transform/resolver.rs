use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::debug;

use crate::error::{EtlError, EtlResult};
use crate::transform::query_id::{QueryId, Strategy};

/// What the resolver hands back for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryText {
    Sql(String),
    /// No SQL text; the result is computed in-process.
    Procedural,
}

/// Somewhere SQL assets can be looked up by name.
pub trait QuerySource {
    /// Text of the asset `name`, or `None` if there is no such asset.
    fn load(&self, name: &str) -> EtlResult<Option<String>>;
}

lazy_static! {
    static ref BUNDLED: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("delivery_date_difference", include_str!("../../queries/delivery_date_difference.sql"));
        m.insert("global_ammount_order_status", include_str!("../../queries/global_ammount_order_status.sql"));
        m.insert("revenue_by_month_year", include_str!("../../queries/revenue_by_month_year.sql"));
        m.insert("revenue_per_state", include_str!("../../queries/revenue_per_state.sql"));
        m.insert("top_10_least_revenue_categories", include_str!("../../queries/top_10_least_revenue_categories.sql"));
        m.insert("top_10_revenue_categories", include_str!("../../queries/top_10_revenue_categories.sql"));
        m.insert("real_vs_estimated_delivered_time", include_str!("../../queries/real_vs_estimated_delivered_time.sql"));
        m
    };
}

/// The SQL assets compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledQueries;

impl QuerySource for BundledQueries {
    fn load(&self, name: &str) -> EtlResult<Option<String>> {
        Ok(BUNDLED.get(name).map(|sql| sql.to_string()))
    }
}

/// SQL assets read from `<root>/<name>.sql` at run time.
#[derive(Debug, Clone)]
pub struct QueryDir {
    root: PathBuf,
}

impl QueryDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        QueryDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl QuerySource for QueryDir {
    fn load(&self, name: &str) -> EtlResult<Option<String>> {
        let path = self.root.join(format!("{}.sql", name));
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}

pub struct Resolver {
    source: Box<dyn QuerySource>,
}

impl Resolver {
    pub fn new(source: impl QuerySource + 'static) -> Self {
        Resolver { source: Box::new(source) }
    }

    pub fn bundled() -> Self {
        Resolver::new(BundledQueries)
    }

    /// SQL text for a pass-through query, `Procedural` for a computed one.
    /// A pass-through query without a usable asset is a configuration fault.
    pub fn resolve(&self, id: QueryId) -> EtlResult<QueryText> {
        if let Strategy::Computed(_) = id.strategy() {
            return Ok(QueryText::Procedural);
        }
        match self.source.load(id.as_str())? {
            Some(sql) if !sql.trim().is_empty() => {
                debug!("resolved {} ({} bytes)", id, sql.len());
                Ok(QueryText::Sql(sql))
            }
            _ => Err(EtlError::QueryNotFound(id.as_str().to_string())),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_assets_cover_every_pass_through_query() {
        let resolver = Resolver::bundled();
        for id in QueryId::list_all() {
            match resolver.resolve(*id).unwrap() {
                QueryText::Sql(sql) => {
                    assert!(!id.is_computed());
                    assert!(sql.to_uppercase().contains("SELECT"));
                }
                QueryText::Procedural => assert!(id.is_computed()),
            }
        }
    }

    #[test]
    fn missing_asset_is_a_configuration_fault() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(QueryDir::new(dir.path()));
        let err = resolver.resolve(QueryId::RevenuePerState).unwrap_err();
        assert!(matches!(err, EtlError::QueryNotFound(name) if name == "revenue_per_state"));
        // computed queries never touch the source
        assert_eq!(
            resolver.resolve(QueryId::FreightValueWeightRelationship).unwrap(),
            QueryText::Procedural
        );
    }

    #[test]
    fn empty_asset_is_not_accepted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("revenue_per_state.sql"), "  \n").unwrap();
        let resolver = Resolver::new(QueryDir::new(dir.path()));
        assert!(matches!(
            resolver.resolve(QueryId::RevenuePerState),
            Err(EtlError::QueryNotFound(_))
        ));
    }
}
