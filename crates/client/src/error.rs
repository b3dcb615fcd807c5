//! Client errors.

use thiserror::Error;

/// Errors that can occur when calling the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The base URL or a request path could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// Failed to parse the response body.
    #[error("Response error: {0}")]
    Response(String),

    /// The server answered with a failure envelope.
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the envelope.
        message: String,
    },
}

impl ApiError {
    /// Text suitable for showing to the shopper.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            Self::InvalidUrl(_) | Self::Request(_) | Self::Response(_) => {
                "Could not reach the store, please try again".to_string()
            }
        }
    }

    /// HTTP status of a server failure.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
