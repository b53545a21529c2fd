//! Route handlers for the Neighbors API.

pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        // Tasks
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/:id/respond", post(tasks::respond))
        .route(
            "/api/tasks/:id/responses/:response_id",
            patch(tasks::set_response_status),
        )
        // Users
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user).patch(users::update_user))
        .route("/api/users/:id/tasks", get(users::list_user_tasks))
        .route("/api/users/:id/karma", patch(users::apply_karma))
}
