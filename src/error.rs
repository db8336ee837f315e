use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Connector Errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Exchange API error from {exchange}: {message}")]
    ExchangeApi {
        exchange: String,
        message: String,
    },

    #[error("Response deserialization failed: {0}")]
    DeserializationError(String),

    #[error("Symbol not listed on {exchange}: {symbol}")]
    SymbolNotFound {
        exchange: String,
        symbol: String,
    },

    #[error("No connector available for exchange: {0}")]
    UnsupportedExchange(String),

    // Normalization Errors
    #[error("Funding rate missing in {exchange} response for {symbol}")]
    MissingRate {
        exchange: String,
        symbol: String,
    },

    #[error("Invalid funding rate from {exchange}: {rate}")]
    InvalidRate {
        exchange: String,
        rate: f64,
    },

    // Cycle Errors
    #[error("Polling cycle failed: {0}")]
    Cycle(String),

    // Sink Errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task failure: {0}")]
    TaskFailure(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Errors a fetch task may retry: anything raised by a connector call or
    /// by normalizing its response.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::ExchangeApi { .. }
                | Error::DeserializationError(_)
                | Error::SymbolNotFound { .. }
                | Error::MissingRate { .. }
                | Error::InvalidRate { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DeserializationError(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
