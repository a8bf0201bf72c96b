//! Database initialization
//!
//! Creates the SQLite database on first run, applies the schema
//! idempotently and seeds default settings. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Default busy timeout until the settings table provides one
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_settings_table(&pool).await?;
    create_projects_table(&pool).await?;
    create_template_tasks_table(&pool).await?;
    create_tasks_table(&pool).await?;
    create_progress_entries_table(&pool).await?;

    // Initialize default settings
    init_default_settings(&pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    Ok(pool)
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT,
            start_date DATE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the template_tasks table
///
/// The global task template catalog, one process-wide nested-set tree.
pub async fn create_template_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS template_tasks (
            guid TEXT PRIMARY KEY,
            parent_guid TEXT REFERENCES template_tasks(guid) ON DELETE CASCADE,
            left_bound INTEGER NOT NULL,
            right_bound INTEGER NOT NULL,
            name TEXT NOT NULL,
            volume_h INTEGER NOT NULL DEFAULT 0,
            unit TEXT,
            price_h INTEGER NOT NULL DEFAULT 0,
            weight_h INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (right_bound > left_bound),
            CHECK (volume_h >= 0),
            CHECK (price_h >= 0),
            CHECK (weight_h >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Nested-set range queries scan on the bounds
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_template_tasks_left ON template_tasks(left_bound)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_template_tasks_right ON template_tasks(right_bound)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the tasks table
///
/// Per-project task trees cloned from the template catalog. Bounds are
/// numbered independently per project.
pub async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            project_guid TEXT NOT NULL REFERENCES projects(guid) ON DELETE CASCADE,
            template_guid TEXT,
            parent_guid TEXT REFERENCES tasks(guid) ON DELETE CASCADE,
            left_bound INTEGER NOT NULL,
            right_bound INTEGER NOT NULL,
            name TEXT NOT NULL,
            volume_h INTEGER NOT NULL DEFAULT 0,
            unit TEXT,
            price_h INTEGER NOT NULL DEFAULT 0,
            weight_h INTEGER NOT NULL DEFAULT 0,
            total_price_h INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (right_bound > left_bound),
            CHECK (volume_h >= 0),
            CHECK (price_h >= 0),
            CHECK (weight_h >= 0),
            CHECK (total_price_h >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_guid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_bounds ON tasks(project_guid, left_bound)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_template ON tasks(template_guid)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the progress_entries table
///
/// One row per task per day; writes upsert on the unique key.
pub async fn create_progress_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS progress_entries (
            guid TEXT PRIMARY KEY,
            task_guid TEXT NOT NULL REFERENCES tasks(guid) ON DELETE CASCADE,
            project_guid TEXT NOT NULL REFERENCES projects(guid) ON DELETE CASCADE,
            user_guid TEXT NOT NULL,
            percentage_h INTEGER NOT NULL,
            progress_date DATE NOT NULL,
            notes TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (percentage_h >= 0 AND percentage_h <= 10000)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_progress_task_day \
         ON progress_entries(task_guid, project_guid, progress_date)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_progress_project_day \
         ON progress_entries(project_guid, progress_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// This function ensures all required settings exist with default values.
/// It also handles NULL values by resetting them to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "rollup_mode", "unweighted").await?;
    ensure_setting(pool, "backfill_enabled", "true").await?;
    ensure_setting(pool, "busy_timeout_ms", "5000").await?;

    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE to handle concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;
    }

    Ok(())
}
