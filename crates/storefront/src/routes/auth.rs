//! Authentication route handlers.
//!
//! Sign-in (by registration or login) moves the session's guest cart into
//! the account, cycles the session id and stores the account in the session.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::api::{ApiResponse, AuthUser, LoginRequest, RegisterRequest};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, current_guest, set_current_user};
use crate::models::{Account, CurrentUser};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// `POST /api/auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthUser>>> {
    let Json(body) = payload?;

    let account = AuthService::new(state.accounts())
        .register_with_password(&body.user_name, &body.email, &body.password)
        .await?;
    tracing::info!(account_id = %account.id, "Account registered");

    sign_in(&state, &session, &account).await?;

    Ok(Json(
        ApiResponse::ok(account.to_auth_user())
            .with_message("Registration successful")
            .with_owner(Some(account.id)),
    ))
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthUser>>> {
    let Json(body) = payload?;

    let account = AuthService::new(state.accounts())
        .login_with_password(&body.email, &body.password)
        .await?;

    sign_in(&state, &session, &account).await?;

    Ok(Json(
        ApiResponse::ok(account.to_auth_user())
            .with_message("Logged in successfully")
            .with_owner(Some(account.id)),
    ))
}

/// `POST /api/auth/logout`
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Json<ApiResponse<()>>> {
    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(Json(ApiResponse::acknowledged("Logged out successfully!")))
}

async fn sign_in(state: &AppState, session: &Session, account: &Account) -> Result<()> {
    let merged = match current_guest(session).await? {
        Some(guest) => state.carts().absorb_guest_cart(guest, account.id).await?,
        None => 0,
    };

    session.cycle_id().await?;
    set_current_user(
        session,
        &CurrentUser {
            id: account.id,
            email: account.email.clone(),
            user_name: account.user_name.clone(),
        },
    )
    .await?;
    set_sentry_user(&account.id, Some(account.email.as_str()));

    tracing::info!(account_id = %account.id, merged, "Signed in");
    Ok(())
}
