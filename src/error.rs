use thiserror::Error;

/// Main error type for the csv2mongo system
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Connection exhausted after {attempts} attempts: {last_error}")]
    ConnectionExhausted { attempts: u32, last_error: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Operation '{operation}' failed: {message}")]
    Operation { operation: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrationError {
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether a connection attempt that failed with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Configuration { .. })
    }
}
