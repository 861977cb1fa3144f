//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Database;

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        // Connect to database with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self { pool };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?;

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create initial schema
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            Self::create_batches_schema(conn).await?;
            Self::create_items_schema(conn).await?;
            Self::create_logs_schema(conn).await?;
            Self::create_runtime_state_table(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    /// Create article_batches table and its indexes
    async fn create_batches_schema(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            r#"
            CREATE TABLE article_batches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id TEXT NOT NULL UNIQUE,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                source_filename TEXT,
                status INTEGER NOT NULL DEFAULT 0,
                total_items INTEGER NOT NULL,
                completed_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                default_config TEXT,
                error_message TEXT,
                created_at INTEGER NOT NULL,
                started_at INTEGER,
                completed_at INTEGER,
                CHECK (completed_count + failed_count <= total_items)
            )
            "#,
            "create article_batches table",
        )
        .await?;

        Self::execute_ddl(
            conn,
            "CREATE INDEX idx_batches_owner_created ON article_batches(owner, created_at DESC)",
            "create owner index",
        )
        .await?;

        Self::execute_ddl(
            conn,
            "CREATE INDEX idx_batches_status_created ON article_batches(status, created_at, id)",
            "create status index",
        )
        .await
    }

    /// Create batch_articles table and its indexes
    async fn create_items_schema(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            r#"
            CREATE TABLE batch_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id INTEGER NOT NULL REFERENCES article_batches(id) ON DELETE CASCADE,
                order_index INTEGER NOT NULL,
                topic TEXT NOT NULL,
                keywords TEXT NOT NULL DEFAULT '',
                tone TEXT NOT NULL DEFAULT 'professional',
                word_count INTEGER NOT NULL DEFAULT 1000,
                custom_persona TEXT NOT NULL DEFAULT '',
                link_count INTEGER NOT NULL DEFAULT 5,
                use_inline_links INTEGER NOT NULL DEFAULT 1,
                use_apa_style INTEGER NOT NULL DEFAULT 0,
                extra_fields TEXT,
                status INTEGER NOT NULL DEFAULT 0,
                attempt_count INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                generated_title TEXT,
                generated_content TEXT,
                meta_description TEXT,
                actual_word_count INTEGER,
                queued_at INTEGER NOT NULL,
                started_at INTEGER,
                completed_at INTEGER,
                processing_duration_seconds REAL,
                UNIQUE(batch_id, order_index)
            )
            "#,
            "create batch_articles table",
        )
        .await?;

        Self::execute_ddl(
            conn,
            "CREATE INDEX idx_items_batch_status ON batch_articles(batch_id, status, order_index)",
            "create item status index",
        )
        .await
    }

    /// Create processing_logs table and its index
    async fn create_logs_schema(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            r#"
            CREATE TABLE processing_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id INTEGER NOT NULL REFERENCES article_batches(id) ON DELETE CASCADE,
                item_id INTEGER REFERENCES batch_articles(id) ON DELETE CASCADE,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                details TEXT NOT NULL DEFAULT '{}',
                created_at INTEGER NOT NULL
            )
            "#,
            "create processing_logs table",
        )
        .await?;

        Self::execute_ddl(
            conn,
            "CREATE INDEX idx_logs_batch_created ON processing_logs(batch_id, created_at DESC, id DESC)",
            "create log index",
        )
        .await
    }

    /// Create runtime_state key/value table
    async fn create_runtime_state_table(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            r#"
            CREATE TABLE runtime_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            "create runtime_state table",
        )
        .await?;

        // A fresh database has never shut down cleanly
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO runtime_state (key, value, updated_at) VALUES ('clean_shutdown', 'false', ?)",
        )
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to seed runtime_state: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn execute_ddl(conn: &mut SqliteConnection, sql: &str, what: &str) -> Result<()> {
        sqlx::query(sql).execute(&mut *conn).await.map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to {}: {}",
                what, e
            )))
        })?;
        Ok(())
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i64) -> Result<()> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record migration v{}: {}",
                    version, e
                )))
            })?;
        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
