//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopfront_core::EmailError),

    /// Missing or overlong display name.
    #[error("invalid user name: {0}")]
    InvalidUserName(String),

    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account with this email.
    #[error("user not found")]
    UserNotFound,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
