use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashqError {
    #[error("Server is not listening on {0}")]
    TransportUnavailable(PathBuf),

    #[error("Failed to create channel {path}: {source}")]
    ChannelCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver reply to {path}: {source}")]
    Delivery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Field {field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Target file not found: {0}")]
    TargetMissing(PathBuf),

    #[error("No response received")]
    NoResponse,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HashqError>;
