use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone offset: {0}")]
    InvalidTimezone(String),

    #[error("Tracing error: {0}")]
    TracingError(String),
}

impl From<config::ConfigError> for SharedError {
    fn from(err: config::ConfigError) -> Self {
        SharedError::ConfigurationError(err.to_string())
    }
}
