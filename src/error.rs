use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Statistics Errors
    #[error("Division by zero")]
    DivisionByZero,

    // Request Errors
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    // Upstream Errors
    #[error("Upstream responded with status {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Deserialization failed: {0}")]
    DeserializationError(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::MetricsError(e.to_string())
    }
}
