use thiserror::Error;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the phase pipeline.
///
/// `ExternalService` is the only retryable variant; validation and
/// not-found errors surface to the caller with no side effects. Retrieval
/// degradation is deliberately absent here: a failed similarity search is
/// downgraded to empty semantic context by the assembler, never raised.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("external service error ({provider}): {message}")]
    ExternalService { provider: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid database value: {0}")]
    InvalidDbValue(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn external(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::ExternalService {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ExternalService { .. })
    }
}

/// Configuration loading/validation failure.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);
