//! Authentication service.
//!
//! Password registration and sign-in. Cart merging on sign-in is done by the
//! route handlers once the account is known.

mod accounts;
mod error;

pub use accounts::{AccountStore, MemoryAccounts};
pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use shopfront_core::Email;

use crate::db::RepositoryError;
use crate::models::Account;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum display name length.
const MAX_USER_NAME_LENGTH: usize = 64;

/// Authentication service.
pub struct AuthService<'a> {
    accounts: &'a dyn AccountStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(accounts: &'a dyn AccountStore) -> Self {
        Self { accounts }
    }

    /// Register a new account with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUserName` if the display name is empty or too long.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        user_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let user_name = validate_user_name(user_name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let account = self
            .accounts
            .create_with_password(user_name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(account)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let email = Email::parse(email)?;

        let (account, password_hash) = self
            .accounts
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &password_hash)?;

        Ok(account)
    }
}

fn validate_user_name(user_name: &str) -> Result<&str, AuthError> {
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(AuthError::InvalidUserName("user name is required".to_owned()));
    }
    if user_name.chars().count() > MAX_USER_NAME_LENGTH {
        return Err(AuthError::InvalidUserName(format!(
            "user name must be at most {MAX_USER_NAME_LENGTH} characters"
        )));
    }
    Ok(user_name)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
