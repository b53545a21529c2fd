//! Task CRUD operations.

use neighbors_core::{Task, TaskStatus};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::begin_write;
use crate::error::{DatabaseError, Result};
use crate::models::{invalid, NewTask, TaskFilter, TaskRow, TaskUpdate};

/// Columns selected for a [`TaskRow`], including the response count.
pub(crate) const TASK_COLUMNS: &str = r#"
    t.id, t.title, t.description, t.category, t.status, t.urgency, t.reward,
    t.image_url, t.video_url, t.author_id, t.created_at,
    (SELECT COUNT(*) FROM responses r WHERE r.task_id = t.id) AS response_count
"#;

fn rows_to_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

/// Create a new open task.
///
/// Fails with [`DatabaseError::NotFound`] if the author does not exist.
pub async fn create_task(pool: &SqlitePool, new_task: &NewTask) -> Result<Task> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO tasks (
            id, title, description, category, status, urgency, reward,
            image_url, video_url, author_id, created_at
        )
        VALUES (?, ?, ?, ?, 'open', ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(new_task.title.trim())
    .bind(new_task.description.trim())
    .bind(new_task.category.as_str())
    .bind(new_task.urgency.map(|u| u.as_str()))
    .bind(new_task.reward)
    .bind(new_task.image_url.as_deref())
    .bind(new_task.video_url.as_deref())
    .bind(&new_task.author_id)
    .bind(new_task.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_foreign_key_violation() {
                return DatabaseError::NotFound {
                    entity: "User",
                    id: new_task.author_id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    tracing::info!(
        task_id = %id,
        author_id = %new_task.author_id,
        category = %new_task.category,
        "Task created"
    );

    get_task(pool, &id).await
}

/// Get a task by ID.
pub async fn get_task(pool: &SqlitePool, id: &str) -> Result<Task> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?");

    sqlx::query_as::<_, TaskRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Task",
            id: id.to_string(),
        })?
        .try_into()
}

/// List tasks matching `filter`, newest first.
pub async fn list_tasks(pool: &SqlitePool, filter: &TaskFilter) -> Result<Vec<Task>> {
    let query = format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks t
        WHERE (?1 IS NULL OR t.category = ?1)
          AND (?2 IS NULL OR t.status = ?2)
        ORDER BY t.created_at DESC, t.id
        "#
    );

    let rows = sqlx::query_as::<_, TaskRow>(&query)
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?;

    rows_to_tasks(rows)
}

/// Count tasks matching `filter`.
pub async fn count_tasks(pool: &SqlitePool, filter: &TaskFilter) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM tasks
        WHERE (?1 IS NULL OR category = ?1)
          AND (?2 IS NULL OR status = ?2)
        "#,
    )
    .bind(filter.category.map(|c| c.as_str()))
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List tasks created by a user, newest first.
pub async fn list_tasks_by_author(pool: &SqlitePool, author_id: &str) -> Result<Vec<Task>> {
    let query = format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks t
        WHERE t.author_id = ?
        ORDER BY t.created_at DESC, t.id
        "#
    );

    let rows = sqlx::query_as::<_, TaskRow>(&query)
        .bind(author_id)
        .fetch_all(pool)
        .await?;

    rows_to_tasks(rows)
}

/// Apply a partial update.
///
/// Status may only move forward; anything else is
/// [`DatabaseError::InvalidTransition`].
pub async fn update_task(pool: &SqlitePool, id: &str, update: &TaskUpdate) -> Result<Task> {
    let mut tx = begin_write(pool).await?;

    let current = sqlx::query_scalar::<_, String>(
        r#"
        SELECT status FROM tasks WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Task",
        id: id.to_string(),
    })?;

    let current: TaskStatus = current.parse().map_err(invalid("Task", id))?;

    if let Some(next) = update.status {
        if !current.can_advance_to(next) {
            return Err(DatabaseError::InvalidTransition {
                id: id.to_string(),
                from: current,
                to: next,
            });
        }
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            status = COALESCE(?, status),
            urgency = COALESCE(?, urgency),
            reward = COALESCE(?, reward)
        WHERE id = ?
        "#,
    )
    .bind(update.title.as_deref().map(str::trim))
    .bind(update.description.as_deref().map(str::trim))
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.urgency.map(|u| u.as_str()))
    .bind(update.reward)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if let Some(next) = update.status.filter(|next| *next != current) {
        tracing::info!(task_id = %id, from = %current, to = %next, "Task status changed");
    }

    get_task(pool, id).await
}

/// Delete a task and its responses.
pub async fn delete_task(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM tasks
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Task",
            id: id.to_string(),
        });
    }

    tracing::info!(task_id = %id, "Task deleted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use chrono::Duration;
    use neighbors_core::{Category, Urgency, UrgencySetting};

    #[tokio::test]
    async fn test_create_and_get_task() {
        let db = test_db().await;
        let author = seed_user(&db, "Ivan", "+79991234567").await;

        let new = NewTask {
            urgency: Some(Urgency::High),
            reward: Some(500),
            image_url: Some("https://example.com/sink.jpg".to_string()),
            ..new_task(&author.id, "Fix sink", Category::Repair)
        };
        let task = create_task(db.pool(), &new).await.unwrap();

        assert_eq!(task.title, "Fix sink");
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.urgency, UrgencySetting::Explicit(Urgency::High));
        assert_eq!(task.reward, Some(500));
        assert_eq!(task.author_id, author.id);
        assert_eq!(task.created_at, t0());
        assert_eq!(task.response_count, 0);

        let fetched = get_task(db.pool(), &task.id).await.unwrap();
        assert_eq!(fetched, task);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_all_apply() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir).await;
        let author = seed_user(&db, "Ivan", "+79991234567").await;
        let sink = seed_task(&db, &author.id, "Fix sink", Category::Repair).await;

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let db = db.clone();
                let id = sink.id.clone();
                tokio::spawn(async move {
                    let update = TaskUpdate {
                        status: Some(TaskStatus::InProgress),
                        reward: Some(i),
                        ..Default::default()
                    };
                    update_task(db.pool(), &id, &update).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let task = get_task(db.pool(), &sink.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_create_task_unknown_author() {
        let db = test_db().await;
        let orphan = new_task("missing", "Fix sink", Category::Repair);
        let result = create_task(db.pool(), &orphan).await;
        assert!(matches!(
            result,
            Err(DatabaseError::NotFound { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn test_list_tasks_with_filter() {
        let db = test_db().await;
        let author = seed_user(&db, "Ivan", "+79991234567").await;

        let older = NewTask {
            created_at: t0() - Duration::hours(3),
            ..new_task(&author.id, "Walk dog", Category::Pets)
        };
        create_task(db.pool(), &older).await.unwrap();
        let sink = seed_task(&db, &author.id, "Fix sink", Category::Repair).await;
        seed_task(&db, &author.id, "Feed cat", Category::Pets).await;

        let all = list_tasks(db.pool(), &TaskFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].title, "Walk dog");

        let pets = TaskFilter {
            category: Some(Category::Pets),
            ..Default::default()
        };
        assert_eq!(list_tasks(db.pool(), &pets).await.unwrap().len(), 2);
        assert_eq!(count_tasks(db.pool(), &pets).await.unwrap(), 2);

        let update = TaskUpdate {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        update_task(db.pool(), &sink.id, &update).await.unwrap();

        let open = TaskFilter {
            status: Some(TaskStatus::Open),
            ..Default::default()
        };
        let open_tasks = list_tasks(db.pool(), &open).await.unwrap();
        assert_eq!(open_tasks.len(), 2);
        assert!(open_tasks.iter().all(|t| t.status == TaskStatus::Open));
        assert_eq!(count_tasks(db.pool(), &TaskFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_tasks_by_author() {
        let db = test_db().await;
        let ivan = seed_user(&db, "Ivan", "+79991234567").await;
        let maria = seed_user(&db, "Maria", "+79997654321").await;
        seed_task(&db, &ivan.id, "Fix sink", Category::Repair).await;
        seed_task(&db, &maria.id, "Walk dog", Category::Pets).await;

        let tasks = list_tasks_by_author(db.pool(), &ivan.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Fix sink");
    }

    #[tokio::test]
    async fn test_update_task_fields() {
        let db = test_db().await;
        let author = seed_user(&db, "Ivan", "+79991234567").await;
        let task = seed_task(&db, &author.id, "Fix sink", Category::Repair).await;

        let update = TaskUpdate {
            title: Some("Fix kitchen sink".to_string()),
            urgency: Some(Urgency::Urgent),
            reward: Some(300),
            ..Default::default()
        };
        let updated = update_task(db.pool(), &task.id, &update).await.unwrap();
        assert_eq!(updated.title, "Fix kitchen sink");
        assert_eq!(updated.description, task.description);
        assert_eq!(updated.urgency, UrgencySetting::Explicit(Urgency::Urgent));
        assert_eq!(updated.reward, Some(300));

        // An empty update keeps the explicit urgency
        let unchanged = update_task(db.pool(), &task.id, &TaskUpdate::default())
            .await
            .unwrap();
        assert_eq!(unchanged.urgency, UrgencySetting::Explicit(Urgency::Urgent));
    }

    #[tokio::test]
    async fn test_update_task_rejects_backward_status() {
        let db = test_db().await;
        let author = seed_user(&db, "Ivan", "+79991234567").await;
        let task = seed_task(&db, &author.id, "Fix sink", Category::Repair).await;

        let forward = TaskUpdate {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        let updated = update_task(db.pool(), &task.id, &forward).await.unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);

        let backward = TaskUpdate {
            status: Some(TaskStatus::Open),
            ..Default::default()
        };
        let result = update_task(db.pool(), &task.id, &backward).await;
        assert!(matches!(
            result,
            Err(DatabaseError::InvalidTransition {
                from: TaskStatus::InProgress,
                to: TaskStatus::Open,
                ..
            })
        ));

        let fetched = get_task(db.pool(), &task.id).await.unwrap();
        assert_eq!(fetched.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let db = test_db().await;
        let result = update_task(db.pool(), "missing", &TaskUpdate::default()).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_task() {
        let db = test_db().await;
        let author = seed_user(&db, "Ivan", "+79991234567").await;
        let task = seed_task(&db, &author.id, "Fix sink", Category::Repair).await;

        delete_task(db.pool(), &task.id).await.unwrap();
        let result = delete_task(db.pool(), &task.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
