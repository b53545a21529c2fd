//! Index and health check endpoints.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: state.clock.now(),
    })
}

#[derive(Serialize)]
pub struct Index {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// API name, version and the list of endpoints.
pub async fn index() -> Json<Index> {
    Json(Index {
        name: "Neighbors API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /health",
            "POST /api/auth/register",
            "POST /api/auth/login",
            "GET /api/auth/me",
            "GET /api/tasks",
            "POST /api/tasks",
            "GET /api/tasks/:id",
            "PATCH /api/tasks/:id",
            "DELETE /api/tasks/:id",
            "POST /api/tasks/:id/respond",
            "PATCH /api/tasks/:id/responses/:response_id",
            "GET /api/users",
            "GET /api/users/:id",
            "PATCH /api/users/:id",
            "GET /api/users/:id/tasks",
            "PATCH /api/users/:id/karma",
        ],
    })
}
