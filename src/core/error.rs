use thiserror::Error;

/// Centralized error types for the application
///
/// Every fallible I/O boundary (user store, Telegram, HTTP integrations) converts
/// into this enum. Handlers never propagate it past the dispatcher; they log it and
/// answer the user instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },

    /// Service-account token errors
    #[error("Google auth error: {0}")]
    Auth(#[from] gcp_auth::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// User store errors
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
