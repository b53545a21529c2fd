//! Responses: offers to help with a task.

use chrono::{DateTime, Utc};
use neighbors_core::{ResponseStatus, Task, TaskResponse};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::begin_write;
use crate::error::{DatabaseError, Result};
use crate::models::{ResponseRow, TaskRow};
use crate::task::TASK_COLUMNS;

/// Load a task inside the caller's transaction.
async fn task_in_tx(conn: &mut SqliteConnection, task_id: &str) -> Result<Task> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?");

    sqlx::query_as::<_, TaskRow>(&query)
        .bind(task_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Task",
            id: task_id.to_string(),
        })?
        .try_into()
}

/// Fail with [`DatabaseError::TaskClosed`] unless the task is open.
async fn require_open(conn: &mut SqliteConnection, task_id: &str) -> Result<Task> {
    let task = task_in_tx(conn, task_id).await?;
    if !task.accepts_responses() {
        return Err(DatabaseError::TaskClosed(task_id.to_string()));
    }
    Ok(task)
}

/// Record `user_id`'s offer on an open task.
///
/// There is at most one response per (task, user). Responding again replaces
/// the message of the existing response and keeps its status.
pub async fn upsert_response(
    pool: &SqlitePool,
    task_id: &str,
    user_id: &str,
    message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TaskResponse> {
    let mut tx = begin_write(pool).await?;

    require_open(&mut tx, task_id).await?;

    sqlx::query(
        r#"
        INSERT INTO responses (id, task_id, user_id, message, status, created_at)
        VALUES (?, ?, ?, ?, 'pending', ?)
        ON CONFLICT(task_id, user_id) DO UPDATE SET
            message = excluded.message
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(task_id)
    .bind(user_id)
    .bind(message)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "User",
                    id: user_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    let row = sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT id, task_id, user_id, message, status, created_at
        FROM responses
        WHERE task_id = ? AND user_id = ?
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        task_id = %task_id,
        user_id = %user_id,
        response_id = %row.id,
        "Response recorded"
    );

    row.try_into()
}

/// Get a response by ID.
pub async fn get_response(pool: &SqlitePool, id: &str) -> Result<TaskResponse> {
    sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT id, task_id, user_id, message, status, created_at
        FROM responses
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Response",
        id: id.to_string(),
    })?
    .try_into()
}

/// List responses to a task, oldest first.
pub async fn list_responses(pool: &SqlitePool, task_id: &str) -> Result<Vec<TaskResponse>> {
    sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT id, task_id, user_id, message, status, created_at
        FROM responses
        WHERE task_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(TaskResponse::try_from)
    .collect()
}

/// Accept or reject a response to `task_id`.
///
/// Only an open task can have a response accepted; accepting moves it to
/// in_progress in the same transaction, so at most one response per task is
/// ever accepted.
pub async fn set_response_status(
    pool: &SqlitePool,
    task_id: &str,
    response_id: &str,
    status: ResponseStatus,
) -> Result<TaskResponse> {
    let mut tx = begin_write(pool).await?;

    if status == ResponseStatus::Accepted {
        require_open(&mut tx, task_id).await?;
    }

    let result = sqlx::query(
        r#"
        UPDATE responses
        SET status = ?
        WHERE id = ? AND task_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(response_id)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Response",
            id: response_id.to_string(),
        });
    }

    if status == ResponseStatus::Accepted {
        let advanced = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'in_progress'
            WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        if advanced.rows_affected() > 0 {
            tracing::info!(
                task_id = %task_id,
                response_id = %response_id,
                "Task moved to in_progress"
            );
        }
    }

    tx.commit().await?;

    tracing::debug!(
        task_id = %task_id,
        response_id = %response_id,
        status = %status,
        "Response status set"
    );

    get_response(pool, response_id).await
}
