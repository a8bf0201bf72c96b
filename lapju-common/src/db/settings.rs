//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).
//! All settings are global/system-wide.

use crate::error::{Error, Result};
use crate::rollup::RollupMode;
use sqlx::SqlitePool;
use std::str::FromStr;

/// Generic setting getter
pub async fn get_setting<T: FromStr>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let row: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match row.flatten() {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &SqlitePool, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}

/// Get the configured rollup mode, defaulting to unweighted
pub async fn get_rollup_mode(db: &SqlitePool) -> Result<RollupMode> {
    match get_setting::<String>(db, "rollup_mode").await? {
        Some(value) => RollupMode::from_str(&value).ok_or_else(|| {
            Error::Config(format!("Unknown rollup_mode setting value: {}", value))
        }),
        None => {
            set_setting(db, "rollup_mode", RollupMode::Unweighted.as_str()).await?;
            Ok(RollupMode::Unweighted)
        }
    }
}

/// Whether first-entry backfill is enabled (default true)
pub async fn backfill_enabled(db: &SqlitePool) -> Result<bool> {
    match get_setting::<bool>(db, "backfill_enabled").await? {
        Some(enabled) => Ok(enabled),
        None => {
            set_setting(db, "backfill_enabled", true).await?;
            Ok(true)
        }
    }
}
