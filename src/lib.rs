pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod extract;
pub mod load;
pub mod planner;
pub mod sql;
pub mod storage;
pub mod transform;

pub use config::Config;
pub use engine::{Engine, Store};
pub use error::{EtlError, EtlResult};
pub use storage::{Column, ColumnType, Table, Value};
pub use transform::{Pipeline, QueryId, QueryResult, ResultSet, run_queries};
