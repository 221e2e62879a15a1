use std::fmt;

use crate::engine::Store;
use crate::error::EtlResult;
use crate::storage::table::Table;
use crate::transform::{freight, orders_per_day};

/// The analytical queries the pipeline knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryId {
    DeliveryDateDifference,
    GlobalAmmountOrderStatus,
    RevenueByMonthYear,
    RevenuePerState,
    Top10LeastRevenueCategories,
    Top10RevenueCategories,
    RealVsEstimatedDeliveredTime,
    OrdersPerDayAndHolidays2017,
    FreightValueWeightRelationship,
}

const ALL_QUERIES: [QueryId; 9] = [
    QueryId::DeliveryDateDifference,
    QueryId::GlobalAmmountOrderStatus,
    QueryId::RevenueByMonthYear,
    QueryId::RevenuePerState,
    QueryId::Top10LeastRevenueCategories,
    QueryId::Top10RevenueCategories,
    QueryId::RealVsEstimatedDeliveredTime,
    QueryId::OrdersPerDayAndHolidays2017,
    QueryId::FreightValueWeightRelationship,
];

/// How a query's result is produced.
#[derive(Clone, Copy)]
pub enum Strategy {
    /// Submit the query's SQL text to the store unchanged.
    PassThrough,
    /// Compute the result in-process from base tables.
    Computed(fn(&dyn Store) -> EtlResult<Table>),
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::PassThrough => write!(f, "PassThrough"),
            Strategy::Computed(_) => write!(f, "Computed"),
        }
    }
}

impl QueryId {
    /// Every query, in the order the pipeline runs them.
    pub fn list_all() -> &'static [QueryId] {
        &ALL_QUERIES
    }

    /// Stable name: the SQL asset key and the output table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryId::DeliveryDateDifference => "delivery_date_difference",
            // misspelt, but it names persisted output tables
            QueryId::GlobalAmmountOrderStatus => "global_ammount_order_status",
            QueryId::RevenueByMonthYear => "revenue_by_month_year",
            QueryId::RevenuePerState => "revenue_per_state",
            QueryId::Top10LeastRevenueCategories => "top_10_least_revenue_categories",
            QueryId::Top10RevenueCategories => "top_10_revenue_categories",
            QueryId::RealVsEstimatedDeliveredTime => "real_vs_estimated_delivered_time",
            QueryId::OrdersPerDayAndHolidays2017 => "orders_per_day_and_holidays_2017",
            QueryId::FreightValueWeightRelationship => "freight_value_weight_relationship",
        }
    }

    pub fn from_name(name: &str) -> Option<QueryId> {
        ALL_QUERIES.iter().copied().find(|id| id.as_str() == name)
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            QueryId::OrdersPerDayAndHolidays2017 => {
                Strategy::Computed(orders_per_day::orders_per_day_and_holidays_2017)
            }
            QueryId::FreightValueWeightRelationship => {
                Strategy::Computed(freight::freight_value_weight_relationship)
            }
            _ => Strategy::PassThrough,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.strategy(), Strategy::Computed(_))
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
