use std::path::PathBuf;

use logpose_core::LogposeError;
use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("no logpose history found for {name}")]
    NoHistory { name: String },
    #[error(
        "the logpose files must have the same structure: {key} has routes [{}], expected [{}]",
        found.join(", "),
        expected.join(", ")
    )]
    SchemaMismatch {
        key: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error(transparent)]
    Store(#[from] LogposeError),
    #[error("table error: {0}")]
    Table(#[from] PolarsError),
    #[error("export to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = HistoryError> = std::result::Result<T, E>;
