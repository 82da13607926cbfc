use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Poll Pipeline Errors
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Reconnect attempts exhausted after {attempts} consecutive failures")]
    ReconnectExhausted { attempts: u32 },

    // Wire Errors
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task failure: {0}")]
    TaskFailure(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single `PriceSource` attempt.
///
/// Never escapes the fallback chain; it is logged and counted there.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Source timed out after {0} ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("No contract code at {0}")]
    NoContractCode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err.to_string())
    }
}
