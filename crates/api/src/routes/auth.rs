//! Registration, login and the current user.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use database::models::NewUser;
use database::user;
use neighbors_core::{validation, User};
use serde::{Deserialize, Serialize};

use crate::auth::{bearer_token, hash_password, verify_password};
use crate::error::{ApiError, Result};
use crate::extract::AppJson;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid phone or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// A user together with a freshly issued token.
#[derive(Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Resolve the caller from the bearer token.
pub fn current_user_id(state: &AppState, headers: &HeaderMap) -> Result<String> {
    let token = bearer_token(headers)?;
    let claims = state.tokens.verify(token, state.clock.now())?;
    Ok(claims.sub)
}

/// Register a new user.
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Session>)> {
    validation::validate_name(&req.name)?;
    validation::validate_phone(&req.phone)?;
    validation::validate_password(&req.password)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {e}")))??;

    let now = state.clock.now();
    let new_user = NewUser {
        name: req.name,
        phone: req.phone,
        password_hash,
        created_at: now,
    };
    let user = user::create_user(state.db.pool(), &new_user).await?;
    let token = state.tokens.issue(&user.id, now)?;

    Ok((StatusCode::CREATED, Json(Session { user, token })))
}

/// Log in with phone and password.
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<Session>> {
    let credentials = user::get_credentials(state.db.pool(), &req.phone)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let password = req.password;
    let hash = credentials.password_hash;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verification task failed: {e}")))??;

    if !valid {
        tracing::warn!(user_id = %credentials.user_id, "Rejected login");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let user = user::get_user(state.db.pool(), &credentials.user_id).await?;
    let token = state.tokens.issue(&user.id, state.clock.now())?;

    Ok(Json(Session { user, token }))
}

/// The user the bearer token belongs to.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>> {
    let user_id = current_user_id(&state, &headers)?;

    let user = user::get_user(state.db.pool(), &user_id)
        .await
        .map_err(|e| match e {
            database::DatabaseError::NotFound { .. } => {
                ApiError::Unauthorized("Unknown user".to_string())
            }
            other => other.into(),
        })?;

    Ok(Json(user))
}
