use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed state file {}: {source}", .path.display())]
    MalformedState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
}

pub type Result<T> = std::result::Result<T, AccountingError>;
