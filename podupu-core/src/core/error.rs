//! Error types for the Podupu core library.

use thiserror::Error;

/// All errors that can occur within the Podupu core library.
#[derive(Debug, Error)]
pub enum PodupuError {
    /// The backend URL or API key is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The hosted backend rejected a request or could not be reached.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A SQLite operation failed inside the local backend.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Sign-in, sign-up, sign-out or session lookup failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Input was rejected before it reached the backend.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A payload could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias that pins the error type to [`PodupuError`].
pub type Result<T> = std::result::Result<T, PodupuError>;

impl PodupuError {
    /// Returns `true` for failures raised by a backend while executing an operation.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Database(_))
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) => format!("Missing configuration: {msg}"),
            Self::Backend(msg) => format!("Request failed: {msg}"),
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Auth(msg) => format!("Login failed: {msg}"),
            Self::Validation(msg) => msg.clone(),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::Io(e) => format!("File error: {e}"),
        }
    }
}
