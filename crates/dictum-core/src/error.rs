use thiserror::Error;

/// Top-level error type for the Dictum workspace.
///
/// Subsystem crates define their own error types where callers need to match
/// on them, and implement `From<SubsystemError> for DictumError` so that the
/// `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DictumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Dictionary error: {0}")]
    Dictionary(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for DictumError {
    fn from(err: toml::de::Error) -> Self {
        DictumError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DictumError {
    fn from(err: toml::ser::Error) -> Self {
        DictumError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DictumError {
    fn from(err: serde_json::Error) -> Self {
        DictumError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Dictum operations.
pub type Result<T> = std::result::Result<T, DictumError>;
