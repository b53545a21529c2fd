//! Task feed, task CRUD and responses.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use database::models::{NewTask, TaskFilter, TaskUpdate};
use database::{response, task};
use neighbors_core::{
    feed, validation, Category, CategoryCounts, Clock, FeedQuery, FixedClock, ModelError,
    ResponseStatus, SortMode, Task, TaskResponse, TaskStatus, Urgency,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::extract::{AppJson, AppQuery};
use crate::routes::auth::current_user_id;
use crate::state::AppState;

/// Page size when `limit` is not given.
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest accepted `limit`.
pub const MAX_LIMIT: i64 = 100;

/// A task with its urgency evaluated at request time.
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub effective_urgency: Urgency,
}

impl TaskView {
    pub fn at(task: Task, now: DateTime<Utc>) -> Self {
        let effective_urgency = feed::effective_urgency(&task, now);
        Self {
            task,
            effective_urgency,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct TaskPage {
    pub tasks: Vec<TaskView>,
    /// Matches before pagination
    pub total: usize,
    pub counts: CategoryCounts,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskView,
    pub responses: Vec<TaskResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub urgency: Option<String>,
    pub reward: Option<i64>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub urgency: Option<String>,
    pub reward: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub user_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseStatusRequest {
    pub status: String,
}

/// Parse an optional query value, treating a blank value as absent.
fn parse_optional<T>(raw: Option<&str>) -> std::result::Result<Option<T>, ModelError>
where
    T: FromStr<Err = ModelError>,
{
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse)
        .transpose()
}

fn validate_media(image_url: Option<&str>, video_url: Option<&str>) -> Result<()> {
    for url in [image_url, video_url].into_iter().flatten() {
        validation::validate_media_url(url)?;
    }
    Ok(())
}

/// The task feed.
///
/// Tasks are loaded by status, counted per category, then filtered by
/// category and search text, sorted, and finally paginated.
pub async fn list_tasks(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<TaskPage>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let offset = params.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::BadRequest("offset cannot be negative".to_string()));
    }

    let filter = TaskFilter {
        category: None,
        status: parse_optional::<TaskStatus>(params.status.as_deref())?,
    };
    let query = FeedQuery {
        category: parse_optional::<Category>(params.category.as_deref())?,
        search: params.q.unwrap_or_default(),
        sort: parse_optional::<SortMode>(params.sort.as_deref())?.unwrap_or_default(),
    };

    let tasks = task::list_tasks(state.db.pool(), &filter).await?;
    let counts = feed::count_by_category(&tasks);

    // One instant for the whole request
    let clock = FixedClock::new(state.clock.now());
    let ranked = feed::rank(tasks, &query, &clock);
    let total = ranked.len();

    let tasks = ranked
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|task| TaskView::at(task, clock.now()))
        .collect();

    Ok(Json(TaskPage {
        tasks,
        total,
        counts,
        limit,
        offset,
    }))
}

/// A task with all of its responses.
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskDetail>> {
    let task = task::get_task(state.db.pool(), &id).await?;
    let responses = response::list_responses(state.db.pool(), &id).await?;

    Ok(Json(TaskDetail {
        task: TaskView::at(task, state.clock.now()),
        responses,
    }))
}

/// Create a task authored by the caller.
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskView>)> {
    let author_id = current_user_id(&state, &headers)?;

    validation::validate_title(&req.title)?;
    validation::validate_description(&req.description)?;
    if let Some(reward) = req.reward {
        validation::validate_reward(reward)?;
    }
    validate_media(req.image_url.as_deref(), req.video_url.as_deref())?;

    let now = state.clock.now();
    let new_task = NewTask {
        title: req.title,
        description: req.description,
        category: req.category.parse()?,
        urgency: parse_optional::<Urgency>(req.urgency.as_deref())?,
        reward: req.reward,
        image_url: req.image_url,
        video_url: req.video_url,
        author_id,
        created_at: now,
    };

    let task = task::create_task(state.db.pool(), &new_task).await?;

    Ok((StatusCode::CREATED, Json(TaskView::at(task, now))))
}

/// Partially update a task.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> Result<Json<TaskView>> {
    if let Some(title) = &req.title {
        validation::validate_title(title)?;
    }
    if let Some(description) = &req.description {
        validation::validate_description(description)?;
    }
    if let Some(reward) = req.reward {
        validation::validate_reward(reward)?;
    }

    let update = TaskUpdate {
        title: req.title,
        description: req.description,
        status: parse_optional(req.status.as_deref())?,
        urgency: parse_optional(req.urgency.as_deref())?,
        reward: req.reward,
    };

    let task = task::update_task(state.db.pool(), &id, &update).await?;

    Ok(Json(TaskView::at(task, state.clock.now())))
}

/// Delete a task and its responses.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    task::delete_task(state.db.pool(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Offer to help with an open task.
pub async fn respond(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<RespondRequest>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let response = response::upsert_response(
        state.db.pool(),
        &id,
        &req.user_id,
        message,
        state.clock.now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Accept or reject a response.
pub async fn set_response_status(
    State(state): State<AppState>,
    Path((id, response_id)): Path<(String, String)>,
    AppJson(req): AppJson<ResponseStatusRequest>,
) -> Result<Json<TaskResponse>> {
    let status: ResponseStatus = req.status.parse()?;
    if status == ResponseStatus::Pending {
        return Err(ApiError::BadRequest(
            "status must be accepted or rejected".to_string(),
        ));
    }

    let response = response::set_response_status(state.db.pool(), &id, &response_id, status).await?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_optional() {
        assert_eq!(parse_optional::<Category>(None).unwrap(), None);
        assert_eq!(parse_optional::<Category>(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_optional::<Category>(Some("Pets")).unwrap(),
            Some(Category::Pets)
        );
        assert!(parse_optional::<SortMode>(Some("popularity")).is_err());
    }
}
