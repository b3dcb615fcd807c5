//! Identity resolution from the session.
//!
//! A request is `Authenticated` when the session carries a signed-in
//! account, otherwise `Anonymous` under the session's guest id. A guest id is
//! minted and stored on first use, which is what makes tower-sessions issue
//! the cookie.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use shopfront_core::{GuestId, Identity};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Extractor yielding the request's cart identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CartIdentity(identity): CartIdentity) -> impl IntoResponse {
///     format!("acting for {identity}")
/// }
/// ```
pub struct CartIdentity(pub Identity);

impl<S> FromRequestParts<S> for CartIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        Ok(Self(resolve_identity(&session).await?))
    }
}

/// Resolve the identity carried by `session`, minting a guest id if needed.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn resolve_identity(session: &Session) -> Result<Identity, tower_sessions::session::Error> {
    if let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    {
        return Ok(Identity::Authenticated(user.id));
    }

    if let Some(guest) = current_guest(session).await? {
        return Ok(Identity::Anonymous(guest));
    }

    let guest = GuestId::generate();
    session.insert(session_keys::GUEST_ID, guest).await?;
    tracing::debug!(guest_id = %guest, "Minted guest id");
    Ok(Identity::Anonymous(guest))
}

/// The session's guest id, if one was minted.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn current_guest(
    session: &Session,
) -> Result<Option<GuestId>, tower_sessions::session::Error> {
    session.get::<GuestId>(session_keys::GUEST_ID).await
}

/// Mark the session as signed in, dropping its guest id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.remove::<GuestId>(session_keys::GUEST_ID).await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Destroy the session (logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
