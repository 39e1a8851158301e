use hifitime::HifitimeError;
use thiserror::Error;

use crate::ubx::DecodingError;

#[derive(Debug, Error)]
pub enum Error {
    /// The AssistNow token was never provided
    #[error("UBX AssistNow API key is not provided")]
    MissingApiKey,

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server response exceeds the batch size limit
    #[error("download exceeds {max_size} bytes")]
    Oversize { max_size: usize },

    #[error("UBX AssistNow {0}")]
    Decoding(#[from] DecodingError),

    #[error("invalid cron expression \"{expression}\": {reason}")]
    Schedule { expression: String, reason: String },

    #[error("system time: {0}")]
    Clock(#[from] HifitimeError),

    #[error("unknown variable \"{0}\"")]
    UnknownVariable(String),

    #[error("invalid value for \"{name}\": {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("unknown format \"{0}\"")]
    UnknownFormat(String),

    /// Command line of a client request
    #[error("{0}")]
    Command(#[from] clap::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Refresh worker panicked or was cancelled
    #[error("refresh worker terminated: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
