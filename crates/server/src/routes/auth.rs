//! Authentication route handlers.
//!
//! Password registration and login. The session only stores the user's ID
//! and email; everything else is loaded per request.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Store `user` in the session and tag Sentry events with them.
async fn start_session(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store session");
        AppError::Internal("session store unavailable".to_string())
    })?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and log straight into it.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool()).register(&registration).await?;
    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;
    start_session(&session, &user).await?;
    Ok(Json(user))
}

/// Log out. Succeeds whether or not anyone was logged in.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to clear session");
        AppError::Internal("session store unavailable".to_string())
    })?;
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}
