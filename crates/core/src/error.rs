use thiserror::Error;

pub type ReadoutResult<T> = Result<T, ReadoutError>;

#[derive(Error, Debug)]
pub enum ReadoutError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Ingest error at line {line}: {message}")]
    Ingest { line: u64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ReadoutError {
    fn from(err: config::ConfigError) -> Self {
        ReadoutError::Configuration(err.to_string())
    }
}
