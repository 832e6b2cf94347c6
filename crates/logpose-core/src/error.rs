use std::path::PathBuf;

/// Errors returned by sessions, routes and record stores.
///
/// Everything except [`LogposeError::Storage`] and [`LogposeError::Encode`] is a usage error:
/// the call was made in a state where it cannot succeed. None of them are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum LogposeError {
    #[error("the name {name} is already taken")]
    DuplicateName { name: String },
    #[error("the route {name} does not exist or has been closed")]
    UnknownRoute { name: String },
    #[error("the route {name} is not open in the logpose")]
    UnknownOpenRoute { name: String },
    #[error("the route {name} is already closed")]
    AlreadyClosed { name: String },
    #[error("logpose {session} has already been saved")]
    AlreadySaved { session: String },
    #[error("close all open routes before saving: {}", open.join(", "))]
    OpenRoutes { open: Vec<String> },
    #[error("cannot save a logpose without any route in it")]
    EmptySession,
    #[error("parameters must be an object or a [name, value] pair, got: {0}")]
    InvalidParameterShape(String),
    #[error("invalid session name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("record {key} not found for logpose {session}")]
    NotFound { session: String, key: String },
    #[error("malformed record {}: {reason}", path.display())]
    MalformedRecord { path: PathBuf, reason: String },
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl LogposeError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = LogposeError> = std::result::Result<T, E>;
