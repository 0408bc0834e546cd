use thiserror::Error;

/// Top-level error type for MediChat.
///
/// Crate-level errors (`ChatError`, `ApiError`) convert from this so that
/// configuration and I/O failures propagate with `?` across crate seams.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MedichatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for MedichatError {
    fn from(err: toml::de::Error) -> Self {
        MedichatError::Config(err.to_string())
    }
}

/// A specialized `Result` type for MediChat operations.
pub type Result<T> = std::result::Result<T, MedichatError>;
