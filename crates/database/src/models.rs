//! Database rows and the inputs used to write them.
//!
//! Rows mirror the tables as stored (enums as text). They are converted into
//! `neighbors_core` value objects on the way out, and malformed values are
//! reported as [`DatabaseError::InvalidRow`] rather than coerced.

use chrono::{DateTime, Utc};
use neighbors_core::{
    Category, ModelError, ResponseStatus, Task, TaskResponse, TaskStatus, Urgency, User,
    UserCounts,
};
use serde::Deserialize;
use sqlx::FromRow;

use crate::error::DatabaseError;

pub(crate) fn invalid<'a>(
    entity: &'static str,
    id: &'a str,
) -> impl FnOnce(ModelError) -> DatabaseError + 'a {
    move |source| DatabaseError::InvalidRow {
        entity,
        id: id.to_string(),
        source,
    }
}

/// A `users` row joined with its task and response counts.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub avatar: Option<String>,
    pub karma: i64,
    pub created_at: DateTime<Utc>,
    pub task_count: i64,
    pub response_count: i64,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let user = User::new(&row.id, row.name, row.phone, row.karma, row.created_at)
            .map_err(invalid("User", &row.id))?;

        Ok(user.with_avatar(row.avatar).with_counts(UserCounts {
            tasks: row.task_count,
            responses: row.response_count,
        }))
    }
}

/// A `tasks` row with its response count.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub urgency: Option<String>,
    pub reward: Option<i64>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub response_count: i64,
}

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let category: Category = row.category.parse().map_err(invalid("Task", &row.id))?;
        let status: TaskStatus = row.status.parse().map_err(invalid("Task", &row.id))?;
        let urgency = row
            .urgency
            .as_deref()
            .map(str::parse::<Urgency>)
            .transpose()
            .map_err(invalid("Task", &row.id))?;

        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            category,
            status,
            urgency: urgency.into(),
            reward: row.reward,
            image_url: row.image_url,
            video_url: row.video_url,
            author_id: row.author_id,
            created_at: row.created_at,
            response_count: row.response_count,
        })
    }
}

/// A `responses` row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResponseRow {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ResponseRow> for TaskResponse {
    type Error = DatabaseError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let status: ResponseStatus = row.status.parse().map_err(invalid("Response", &row.id))?;

        Ok(TaskResponse {
            id: row.id,
            task_id: row.task_id,
            user_id: row.user_id,
            message: row.message,
            status,
            created_at: row.created_at,
        })
    }
}

/// A user to register. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Stored login secret for a phone number.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub user_id: String,
    pub password_hash: String,
}

/// Profile fields to change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// A task to create. New tasks always start open.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub urgency: Option<Urgency>,
    pub reward: Option<i64>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// Task fields to change. `None` leaves a field as is.
///
/// An explicit urgency can be replaced but never cleared back to derived.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub urgency: Option<Urgency>,
    pub reward: Option<i64>,
}

/// Storage-side task filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub category: Option<Category>,
    pub status: Option<TaskStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use neighbors_core::{Level, UrgencySetting};

    fn task_row() -> TaskRow {
        TaskRow {
            id: "t1".to_string(),
            title: "Fix sink".to_string(),
            description: "Kitchen sink is leaking".to_string(),
            category: "repair".to_string(),
            status: "open".to_string(),
            urgency: None,
            reward: Some(500),
            image_url: None,
            video_url: None,
            author_id: "u1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            response_count: 2,
        }
    }

    #[test]
    fn test_task_row_conversion() {
        let task = Task::try_from(task_row()).unwrap();
        assert_eq!(task.category, Category::Repair);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.urgency, UrgencySetting::Derived);
        assert_eq!(task.response_count, 2);

        let row = TaskRow {
            urgency: Some("high".to_string()),
            ..task_row()
        };
        let task = Task::try_from(row).unwrap();
        assert_eq!(task.urgency, UrgencySetting::Explicit(Urgency::High));
    }

    #[test]
    fn test_task_row_rejects_unknown_category() {
        let row = TaskRow {
            category: "tools".to_string(),
            ..task_row()
        };
        let err = Task::try_from(row).unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidRow { entity: "Task", .. }
        ));
    }

    #[test]
    fn test_user_row_derives_level() {
        let row = UserRow {
            id: "u1".to_string(),
            name: "Maria".to_string(),
            phone: "+79997654321".to_string(),
            avatar: None,
            karma: 350,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            task_count: 3,
            response_count: 1,
        };
        let user = User::try_from(row.clone()).unwrap();
        assert_eq!(user.level(), Level::GoodSoul);
        assert_eq!(user.counts, Some(UserCounts { tasks: 3, responses: 1 }));

        let negative = UserRow { karma: -5, ..row };
        assert!(matches!(
            User::try_from(negative),
            Err(DatabaseError::InvalidRow {
                source: ModelError::NegativeKarma(-5),
                ..
            })
        ));
    }
}
