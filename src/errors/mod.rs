//! Error handling module for the swipe feed engine.
//!
//! Provides a single error type with stable error codes. None of these errors is fatal:
//! fetch errors become a retryable queue state, submit errors are surfaced to the caller
//! after local bookkeeping, and persistence errors are logged and absorbed by the components.

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    pub const SUBMIT_ERROR: &str = "SUBMIT_ERROR";
    pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";
    pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
    pub const NOT_LOADED: &str = "NOT_LOADED";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Engine error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Remote catalog fetch failed
    Fetch(String),
    /// Feedback submission to the remote catalog failed
    Submit(String),
    /// Key-value storage read or write failed
    Persistence(String),
    /// A stored blob could not be encoded or decoded
    Serialization(String),
    /// A per-user operation was invoked before the user was loaded
    NotLoaded(String),
    /// Invalid configuration value
    Config(String),
}

/// Result alias used across the crate.
pub type FeedResult<T> = Result<T, FeedError>;

impl FeedError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            FeedError::Fetch(_) => codes::FETCH_ERROR,
            FeedError::Submit(_) => codes::SUBMIT_ERROR,
            FeedError::Persistence(_) => codes::PERSISTENCE_ERROR,
            FeedError::Serialization(_) => codes::SERIALIZATION_ERROR,
            FeedError::NotLoaded(_) => codes::NOT_LOADED,
            FeedError::Config(_) => codes::CONFIG_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            FeedError::Fetch(msg) => msg.clone(),
            FeedError::Submit(msg) => msg.clone(),
            FeedError::Persistence(msg) => msg.clone(),
            FeedError::Serialization(msg) => msg.clone(),
            FeedError::NotLoaded(msg) => msg.clone(),
            FeedError::Config(msg) => msg.clone(),
        }
    }

    /// Whether the user can meaningfully retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Fetch(_) | FeedError::Submit(_))
    }
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for FeedError {}

impl From<sqlx::Error> for FeedError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Storage error: {:?}", err);
        FeedError::Persistence(format!("Storage error: {}", err))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        FeedError::Serialization(format!("JSON error: {}", err))
    }
}

// Without request context a transport error is attributed to the fetch path;
// the client maps submission failures explicitly.
impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        FeedError::Fetch(format!("HTTP error: {}", err))
    }
}
