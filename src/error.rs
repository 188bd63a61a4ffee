//! Error types for the SuaTalk client.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication-related errors.
///
/// `Clone` so a single refresh outcome can be delivered to every queued
/// request waiting on it.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Session expired")]
    SessionExpired,
}

/// Credential store errors.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Failed to store credential: {0}")]
    StoreFailed(String),

    #[error("Failed to retrieve credential: {0}")]
    RetrieveFailed(String),

    #[error("Failed to delete credential: {0}")]
    DeleteFailed(String),

    #[error("Credential not found in store")]
    NotFound,
}

/// API-related errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API request failed: HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("API rejected request: {0}")]
    Rejected(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl AppError {
    /// Returns a user-friendly message for display in the UI.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Auth(AuthError::RefreshFailed(_)) => "Session expired. Please sign in again.",
            Self::Auth(AuthError::NoRefreshToken) => "No saved session found.",
            Self::Auth(AuthError::SessionExpired) => "Session expired. Please sign in again.",
            Self::Store(StoreError::StoreFailed(_)) => "Failed to save credentials securely.",
            Self::Store(StoreError::NotFound) => "No saved session found.",
            Self::Store(_) => "Failed to access saved credentials.",
            Self::Api(ApiError::Network(_)) => "Network error. Check your connection.",
            Self::Api(ApiError::Status { status: 403, .. }) => {
                "Insufficient permissions for this operation."
            }
            Self::Api(ApiError::Status { status: 429, .. }) => {
                "Too many requests. Please wait a moment."
            }
            Self::Api(ApiError::Rejected(_)) => "The server rejected this request.",
            Self::Config(_) => "Configuration error. Please check settings.",
            _ => "An error occurred. Please try again.",
        }
    }

    /// Returns true if this error should trigger a sign-out.
    pub fn requires_sign_out(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::RefreshFailed(_))
                | Self::Auth(AuthError::NoRefreshToken)
                | Self::Auth(AuthError::SessionExpired)
                | Self::Api(ApiError::Status { status: 401, .. })
        )
    }
}
