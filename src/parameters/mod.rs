//! Legal parameters and amount tables
//!
//! Both are read-only from a formula's point of view: parameters resolve a
//! numeric threshold effective on a period, tables map (category, course)
//! ordinals to an amount. Both are loaded once and shared across sessions.

mod store;
mod table;
pub mod loader;

pub use store::{ParameterNode, ParameterStore};
pub use table::{AmountTable, TableStore};
pub use loader::DataPaths;
