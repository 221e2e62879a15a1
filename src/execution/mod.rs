pub mod eval;
pub mod runtime;

pub use runtime::execute_select;
