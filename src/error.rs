//! Error types for tradescope

use std::sync::Arc;
use thiserror::Error;

/// Main error type for tradescope operations
///
/// Wrapped library errors sit behind `Arc` so the error is `Clone`: a
/// deduplicated fetch hands the same outcome to every waiting caller.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid radius: {0}")]
    InvalidRadius(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    /// Build an upstream failure for the named collaborator
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used by the HTTP layer
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCoordinates(_) => "INVALID_COORDINATES",
            Self::InvalidRadius(_) => "INVALID_RADIUS",
            Self::InvalidGeometry(_) => "INVALID_GEOMETRY",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Upstream { .. } | Self::Http(_) => "UPSTREAM_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller sent something unusable (as opposed to a failure on our side)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoordinates(_)
                | Self::InvalidRadius(_)
                | Self::InvalidGeometry(_)
                | Self::InvalidInput(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// Result type alias for tradescope operations
pub type Result<T> = std::result::Result<T, Error>;
