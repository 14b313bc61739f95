//! Opening the history database: pool, file creation, schema migrations.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StorageError;

const MAX_CONNECTIONS: u32 = 4;

/// Where the history lives, e.g. `sqlite:homelink.db` or `sqlite::memory:`.
pub struct Config {
    pub database_url: String,
}

impl Config {
    /// Open the pool and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the URL is invalid, the file cannot be
    /// opened, or a migration fails.
    pub async fn build(self) -> Result<Database, StorageError> {
        let connect = SqliteConnectOptions::from_str(&self.database_url)?.create_if_missing(true);

        // Each connection to `:memory:` is its own empty database, so keep
        // exactly one alive for the life of the pool.
        let pool = if self.database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(connect)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(Duration::from_secs(5))
                .connect_with(connect.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(url = %self.database_url, "history database ready");
        Ok(Database { pool })
    }
}

/// An open, migrated history database.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
