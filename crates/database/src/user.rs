//! User CRUD operations and karma updates.

use neighbors_core::{reputation, User};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::begin_write;
use crate::error::{DatabaseError, Result};
use crate::models::{Credentials, NewUser, UserRow, UserUpdate};

/// Columns selected for a [`UserRow`], including derived counts.
const USER_COLUMNS: &str = r#"
    u.id, u.name, u.phone, u.avatar, u.karma, u.created_at,
    (SELECT COUNT(*) FROM tasks t WHERE t.author_id = u.id) AS task_count,
    (SELECT COUNT(*) FROM responses r WHERE r.user_id = u.id) AS response_count
"#;

fn map_unique_phone(phone: &str) -> impl FnOnce(sqlx::Error) -> DatabaseError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: phone.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    }
}

/// Register a new user with zero karma.
///
/// Fails with [`DatabaseError::AlreadyExists`] if the phone is taken.
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, phone, password_hash, karma, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&id)
    .bind(new_user.name.trim())
    .bind(new_user.phone.trim())
    .bind(&new_user.password_hash)
    .bind(new_user.created_at)
    .execute(pool)
    .await
    .map_err(map_unique_phone(&new_user.phone))?;

    tracing::info!(user_id = %id, "User registered");

    get_user(pool, &id).await
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<User> {
    let query = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?");

    sqlx::query_as::<_, UserRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        })?
        .try_into()
}

/// Get a user by phone number.
pub async fn get_user_by_phone(pool: &SqlitePool, phone: &str) -> Result<User> {
    let query = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.phone = ?");

    sqlx::query_as::<_, UserRow>(&query)
        .bind(phone.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "User",
            id: phone.to_string(),
        })?
        .try_into()
}

/// Look up the stored password hash for a phone number.
pub async fn get_credentials(pool: &SqlitePool, phone: &str) -> Result<Option<Credentials>> {
    let credentials = sqlx::query_as::<_, Credentials>(
        r#"
        SELECT id AS user_id, password_hash
        FROM users
        WHERE phone = ?
        "#,
    )
    .bind(phone.trim())
    .fetch_optional(pool)
    .await?;

    Ok(credentials)
}

/// Update profile fields. Karma is not touched here.
pub async fn update_user(pool: &SqlitePool, id: &str, update: &UserUpdate) -> Result<User> {
    let phone = update.phone.as_deref().map(str::trim);

    let result = sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            phone = COALESCE(?, phone),
            avatar = COALESCE(?, avatar)
        WHERE id = ?
        "#,
    )
    .bind(update.name.as_deref().map(str::trim))
    .bind(phone)
    .bind(update.avatar.as_deref())
    .bind(id)
    .execute(pool)
    .await
    .map_err(map_unique_phone(phone.unwrap_or_default()))?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    get_user(pool, id).await
}

/// List all users, highest karma first.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.karma DESC, u.name");

    sqlx::query_as::<_, UserRow>(&query)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
}

/// Count total users.
pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Apply a karma delta and persist the clamped result.
///
/// The read and the write happen in one write transaction, so concurrent
/// deltas to the same user are serialized rather than lost.
pub async fn apply_karma_delta(pool: &SqlitePool, id: &str, delta: i64) -> Result<User> {
    let mut tx = begin_write(pool).await?;

    let current = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT karma FROM users WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })?;

    let update = reputation::apply_delta(current, delta);

    sqlx::query(
        r#"
        UPDATE users SET karma = ? WHERE id = ?
        "#,
    )
    .bind(update.karma)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %id,
        delta,
        from = current,
        karma = update.karma,
        level = %update.level,
        "Karma updated"
    );

    get_user(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use neighbors_core::{Category, Level};

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;
        let user = seed_user(&db, "Ivan", "+79991234567").await;

        assert_eq!(user.karma(), 0);
        assert_eq!(user.level(), Level::Newcomer);
        assert_eq!(user.created_at, t0());

        let fetched = get_user(db.pool(), &user.id).await.unwrap();
        assert_eq!(fetched, user);

        let by_phone = get_user_by_phone(db.pool(), "+79991234567").await.unwrap();
        assert_eq!(by_phone.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let db = test_db().await;
        seed_user(&db, "Ivan", "+79991234567").await;

        let duplicate = NewUser {
            name: "Other".to_string(),
            phone: "+79991234567".to_string(),
            password_hash: "hash".to_string(),
            created_at: t0(),
        };
        let result = create_user(db.pool(), &duplicate).await;
        assert!(matches!(
            result,
            Err(DatabaseError::AlreadyExists { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let db = test_db().await;
        let result = get_user(db.pool(), "missing").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_credentials() {
        let db = test_db().await;
        let user = seed_user(&db, "Ivan", "+79991234567").await;

        let creds = get_credentials(db.pool(), "+79991234567")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(creds.user_id, user.id);
        assert_eq!(creds.password_hash, "hash");

        assert!(get_credentials(db.pool(), "+70000000000")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_user() {
        let db = test_db().await;
        let user = seed_user(&db, "Ivan", "+79991234567").await;

        let update = UserUpdate {
            name: Some("Ivan Ivanov".to_string()),
            avatar: Some("https://example.com/a.png".to_string()),
            ..Default::default()
        };
        let updated = update_user(db.pool(), &user.id, &update).await.unwrap();
        assert_eq!(updated.name, "Ivan Ivanov");
        assert_eq!(updated.phone, "+79991234567");
        assert_eq!(updated.avatar.as_deref(), Some("https://example.com/a.png"));

        let missing = update_user(db.pool(), "missing", &update).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_user_phone_conflict() {
        let db = test_db().await;
        let ivan = seed_user(&db, "Ivan", "+79991234567").await;
        seed_user(&db, "Maria", "+79997654321").await;

        let update = UserUpdate {
            phone: Some("+79997654321".to_string()),
            ..Default::default()
        };
        let result = update_user(db.pool(), &ivan.id, &update).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_apply_karma_delta() {
        let db = test_db().await;
        let user = seed_user(&db, "Ivan", "+79991234567").await;

        let user = apply_karma_delta(db.pool(), &user.id, 150).await.unwrap();
        assert_eq!(user.karma(), 150);
        assert_eq!(user.level(), Level::Neighbor);

        let user = apply_karma_delta(db.pool(), &user.id, 50).await.unwrap();
        assert_eq!(user.karma(), 200);
        assert_eq!(user.level(), Level::GoodSoul);

        let user = apply_karma_delta(db.pool(), &user.id, -1000).await.unwrap();
        assert_eq!(user.karma(), 0);
        assert_eq!(user.level(), Level::Newcomer);

        let fetched = get_user(db.pool(), &user.id).await.unwrap();
        assert_eq!(fetched.karma(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_karma_deltas_all_apply() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir).await;
        let user = seed_user(&db, "Ivan", "+79991234567").await;

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let db = db.clone();
                let id = user.id.clone();
                tokio::spawn(async move { apply_karma_delta(db.pool(), &id, 1).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = get_user(db.pool(), &user.id).await.unwrap();
        assert_eq!(user.karma(), 40);
        assert_eq!(user.level(), Level::Newcomer);
    }

    #[tokio::test]
    async fn test_apply_karma_delta_unknown_user() {
        let db = test_db().await;
        let result = apply_karma_delta(db.pool(), "missing", 10).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_and_count_users() {
        let db = test_db().await;
        let ivan = seed_user(&db, "Ivan", "+79991234567").await;
        let maria = seed_user(&db, "Maria", "+79997654321").await;
        apply_karma_delta(db.pool(), &maria.id, 350).await.unwrap();
        seed_task(&db, &ivan.id, "Fix sink", Category::Repair).await;

        let users = list_users(db.pool()).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Maria");
        assert_eq!(users[1].counts.map(|c| c.tasks), Some(1));

        assert_eq!(count_users(db.pool()).await.unwrap(), 2);
    }
}
