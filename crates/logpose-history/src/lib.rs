//! Reader over persisted logpose records: list, load, and compare runs of the same logpose
//! as polars tables.

mod error;
mod history;
pub mod table;

pub use error::HistoryError;
pub use history::History;
pub use table::{ColumnGroup, ComparisonTable, record_table};
