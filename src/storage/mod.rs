pub mod table;
pub mod value;

pub use table::{Column, Table};
pub use value::{ColumnType, Value};
