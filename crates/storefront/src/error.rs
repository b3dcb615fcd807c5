//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error is rendered as the JSON envelope
//! `{ "success": false, "message": "..." }`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shopfront_core::api::ApiResponse;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::Cart(CartError::invalid_data())
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Session(_)
                | Self::Internal(_)
                | Self::Cart(CartError::Storage(_))
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidInput(_) | CartError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::ProductNotFound | CartError::CartNotFound | CartError::ItemNotFound => {
                    StatusCode::NOT_FOUND
                }
                CartError::Conflict => StatusCode::CONFLICT,
                CartError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidUserName(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Internal details are never exposed.
    fn client_message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Cart(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::UserNotFound => "User not found! Please register first".to_string(),
                AuthError::InvalidCredentials => "Invalid credentials!".to_string(),
                AuthError::UserAlreadyExists => "User already exists with this email!".to_string(),
                AuthError::WeakPassword(msg) | AuthError::InvalidUserName(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Authentication error".to_string()
                }
            },
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body: ApiResponse<()> = ApiResponse::failure(self.client_message());
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with accounts.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the account.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::services::cart::StoreError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_cart_error_status_codes() {
        assert_eq!(
            get_status(CartError::invalid_data().into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::InsufficientStock { available: 2 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ProductNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::CartNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::ItemNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(CartError::Conflict.into()), StatusCode::CONFLICT);
        assert_eq!(
            get_status(CartError::Storage(StoreError::VersionConflict).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            get_status(AuthError::UserNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_envelope_carries_client_message() {
        let body = get_body(CartError::ItemNotFound.into()).await;
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "message": "Item not found" })
        );

        let body = get_body(AuthError::UserAlreadyExists.into()).await;
        assert_eq!(body["message"], "User already exists with this email!");
    }

    #[tokio::test]
    async fn test_storage_errors_are_not_exposed() {
        let err: AppError = RepositoryError::DataCorruption("bad row 42".to_string()).into();
        let body = get_body(err).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
