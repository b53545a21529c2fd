//! SQLite persistence layer for the Neighbors marketplace.
//!
//! This crate provides async database operations for users, tasks and
//! responses using SQLx with SQLite. Rows are returned as `neighbors_core`
//! value objects; a user's level is derived from karma, never stored.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use database::{models::NewUser, user, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:neighbors.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Register a user, then reward them
//!     let new_user = NewUser {
//!         name: "Ivan".to_string(),
//!         phone: "+79991234567".to_string(),
//!         password_hash: "$argon2id$...".to_string(),
//!         created_at: Utc::now(),
//!     };
//!     let ivan = user::create_user(db.pool(), &new_user).await?;
//!     let ivan = user::apply_karma_delta(db.pool(), &ivan.id, 50).await?;
//!     println!("{} is now a {}", ivan.name, ivan.level());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;
pub mod response;
pub mod task;
pub mod user;

pub use error::{DatabaseError, Result};
pub use models::{Credentials, NewTask, NewUser, TaskFilter, TaskUpdate, UserUpdate};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// let db = database::Database::connect("sqlite:data/neighbors.db?mode=rwc").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// Each connection to `sqlite::memory:` is its own database, so in-memory
    /// databases need a pool size of 1.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Begin a transaction that holds the write lock from its first statement.
///
/// Needed wherever a transaction reads before it writes: SQLite cannot upgrade
/// a deferred transaction's read lock while another connection also reads,
/// and fails with `SQLITE_BUSY` instead of waiting out the busy timeout.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
