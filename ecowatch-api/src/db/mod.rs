//! Database access for ecowatch-api
//!
//! SQLite document tables: one row per report, verification and score, plus a
//! running points total per submitter.

pub mod reports;
pub mod users;

use ecowatch_common::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the database file (and parent folder) on first start.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with all tables created
///
/// Every connection to `sqlite::memory:` opens a separate database, so the
/// pool is capped at one connection.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create report, verification, score and user tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            uid TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            image_url TEXT NOT NULL,
            image_content_type TEXT NOT NULL,
            image_file_name TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            report_id TEXT PRIMARY KEY REFERENCES reports(id),
            location_verification TEXT NOT NULL,
            location_confidence INTEGER NOT NULL,
            image_category_verification TEXT NOT NULL,
            category_confidence INTEGER NOT NULL,
            location_remarks TEXT NOT NULL DEFAULT '',
            category_remarks TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scores (
            report_id TEXT PRIMARY KEY REFERENCES reports(id),
            uid TEXT NOT NULL,
            image_score INTEGER NOT NULL,
            description_score INTEGER NOT NULL,
            category_score INTEGER NOT NULL,
            geo_score INTEGER NOT NULL,
            bonus INTEGER NOT NULL,
            total_score INTEGER NOT NULL,
            remarks TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            uid TEXT PRIMARY KEY,
            points INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (reports, verifications, scores, users)");

    Ok(())
}
