//! User profiles, leaderboard and karma.

use axum::extract::{Path, State};
use axum::Json;
use database::models::UserUpdate;
use database::{task, user};
use neighbors_core::{validation, User};
use serde::Deserialize;

use crate::error::Result;
use crate::extract::AppJson;
use crate::routes::tasks::TaskView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct KarmaRequest {
    pub delta: i64,
}

/// All users, highest karma first.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let users = user::list_users(state.db.pool()).await?;
    Ok(Json(users))
}

/// A profile with counts and derived level.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>> {
    let user = user::get_user(state.db.pool(), &id).await?;
    Ok(Json(user))
}

/// Update name, phone or avatar.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(update): AppJson<UserUpdate>,
) -> Result<Json<User>> {
    if let Some(name) = &update.name {
        validation::validate_name(name)?;
    }
    if let Some(phone) = &update.phone {
        validation::validate_phone(phone)?;
    }
    if let Some(avatar) = &update.avatar {
        validation::validate_media_url(avatar)?;
    }

    let user = user::update_user(state.db.pool(), &id, &update).await?;
    Ok(Json(user))
}

/// Tasks authored by a user, newest first.
pub async fn list_user_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TaskView>>> {
    // 404 for unknown users rather than an empty list
    user::get_user(state.db.pool(), &id).await?;

    let now = state.clock.now();
    let tasks = task::list_tasks_by_author(state.db.pool(), &id)
        .await?
        .into_iter()
        .map(|task| TaskView::at(task, now))
        .collect();

    Ok(Json(tasks))
}

/// Apply a karma delta; the stored karma never drops below zero.
pub async fn apply_karma(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<KarmaRequest>,
) -> Result<Json<User>> {
    let user = user::apply_karma_delta(state.db.pool(), &id, req.delta).await?;
    Ok(Json(user))
}
