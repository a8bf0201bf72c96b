//! Progress entry database access
//!
//! Daily percentages are recorded per leaf task, one row per
//! `(task, project, date)`; writing the same key again updates in place
//! (last writer wins). The very first entry for a pair synthesizes history
//! back to the project start, see [`crate::scurve`].

use crate::db::models::{LatestProgress, NewProgress, ProgressEntry};
use crate::db::{projects, settings, tasks};
use crate::rollup::{self, LeafState, RollupReport};
use crate::scurve;
use crate::tree;
use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

type EntryRow = (
    String,
    String,
    String,
    String,
    i64,
    NaiveDate,
    Option<String>,
);

const ENTRY_COLUMNS: &str =
    "guid, task_guid, project_guid, user_guid, percentage_h, progress_date, notes";

fn row_to_entry(row: EntryRow) -> ProgressEntry {
    ProgressEntry {
        guid: row.0,
        task_guid: row.1,
        project_guid: row.2,
        user_guid: row.3,
        percentage_h: row.4,
        progress_date: row.5,
        notes: row.6,
    }
}

/// Record one day's progress for a leaf task
///
/// Validates the percentage range and rejects future dates, upserts on the
/// `(task, project, date)` key, and - exactly once per `(task, project)`
/// lifetime, when this write created the pair's first row - backfills
/// history from the project start date. The triggering row is committed
/// before backfill starts; a backfill failure surfaces to the caller
/// without undoing the entry itself.
pub async fn record_progress(db: &SqlitePool, new: NewProgress) -> Result<ProgressEntry> {
    if !(0..=10_000).contains(&new.percentage_h) {
        return Err(Error::validation(
            "percentage",
            "percentage must be between 0 and 100",
        ));
    }
    let today = Local::now().date_naive();
    if new.progress_date > today {
        return Err(Error::validation(
            "progress_date",
            "progress date must not be in the future",
        ));
    }

    let project = projects::get_project(db, &new.project_guid).await?;

    // The task must exist inside this project
    let task_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE guid = ? AND project_guid = ?)")
            .bind(&new.task_guid)
            .bind(&new.project_guid)
            .fetch_one(db)
            .await?;
    if !task_exists {
        return Err(Error::NotFound(format!(
            "task {} in project {}",
            new.task_guid, new.project_guid
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO progress_entries
            (guid, task_guid, project_guid, user_guid, percentage_h, progress_date, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(task_guid, project_guid, progress_date) DO UPDATE SET
            percentage_h = excluded.percentage_h,
            user_guid = excluded.user_guid,
            notes = excluded.notes,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&new.task_guid)
    .bind(&new.project_guid)
    .bind(&new.user_guid)
    .bind(new.percentage_h)
    .bind(new.progress_date)
    .bind(&new.notes)
    .execute(db)
    .await?;

    let entry = get_entry(db, &new.task_guid, &new.project_guid, new.progress_date).await?;

    // First row ever for this pair triggers the backfill side effect
    let pair_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM progress_entries WHERE task_guid = ? AND project_guid = ?",
    )
    .bind(&new.task_guid)
    .bind(&new.project_guid)
    .fetch_one(db)
    .await?;

    if pair_count == 1 && settings::backfill_enabled(db).await? {
        match project.start_date {
            Some(start_date) => backfill(db, &entry, start_date).await?,
            None => debug!(
                "Project {} has no start date, skipping backfill",
                project.guid
            ),
        }
    }

    Ok(entry)
}

async fn get_entry(
    db: &SqlitePool,
    task_guid: &str,
    project_guid: &str,
    progress_date: NaiveDate,
) -> Result<ProgressEntry> {
    let sql = format!(
        "SELECT {} FROM progress_entries \
         WHERE task_guid = ? AND project_guid = ? AND progress_date = ?",
        ENTRY_COLUMNS
    );
    let row = sqlx::query_as::<_, EntryRow>(&sql)
        .bind(task_guid)
        .bind(project_guid)
        .bind(progress_date)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "progress entry for task {} on {}",
                task_guid, progress_date
            ))
        })?;

    Ok(row_to_entry(row))
}

/// Synthesize history for a first entry, all rows in one transaction
async fn backfill(db: &SqlitePool, entry: &ProgressEntry, start_date: NaiveDate) -> Result<()> {
    let schedule = scurve::backfill_schedule(entry.percentage_h, start_date, entry.progress_date);
    if schedule.is_empty() {
        debug!(
            "Nothing to backfill for task {} before {}",
            entry.task_guid, entry.progress_date
        );
        return Ok(());
    }

    let mut tx = db.begin().await?;
    for day in &schedule {
        sqlx::query(
            r#"
            INSERT INTO progress_entries
                (guid, task_guid, project_guid, user_guid, percentage_h, progress_date, notes)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&entry.task_guid)
        .bind(&entry.project_guid)
        .bind(&entry.user_guid)
        .bind(day.percentage_h)
        .bind(day.date)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(
        "Backfilled {} days for task {} from {}",
        schedule.len(),
        entry.task_guid,
        start_date
    );
    Ok(())
}

/// Latest known entry per task with `progress_date <= as_of`
pub async fn get_latest_progress(
    db: &SqlitePool,
    project_guid: &str,
    as_of: NaiveDate,
) -> Result<HashMap<String, LatestProgress>> {
    let rows = sqlx::query_as::<_, (String, i64, NaiveDate, Option<String>)>(
        r#"
        SELECT p.task_guid, p.percentage_h, p.progress_date, p.notes
        FROM progress_entries p
        JOIN (
            SELECT task_guid, MAX(progress_date) AS latest_date
            FROM progress_entries
            WHERE project_guid = ? AND progress_date <= ?
            GROUP BY task_guid
        ) latest
          ON p.task_guid = latest.task_guid AND p.progress_date = latest.latest_date
        WHERE p.project_guid = ?
        "#,
    )
    .bind(project_guid)
    .bind(as_of)
    .bind(project_guid)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(task_guid, percentage_h, progress_date, notes)| {
            (
                task_guid,
                LatestProgress {
                    percentage_h,
                    progress_date,
                    notes,
                },
            )
        })
        .collect())
}

/// Load the task tree and leaf history, then compute the rollup
///
/// Honors the `rollup_mode` setting; recomputable for any historical
/// `as_of` date.
pub async fn get_rollup(
    db: &SqlitePool,
    project_guid: &str,
    as_of: NaiveDate,
) -> Result<RollupReport> {
    projects::get_project(db, project_guid).await?;

    let nodes = tasks::list_tasks(db, project_guid).await?;
    let latest = get_latest_progress(db, project_guid, as_of).await?;
    let mode = settings::get_rollup_mode(db).await?;

    let mut leaf_states = HashMap::new();
    for node in &nodes {
        if tree::is_leaf(node, &nodes) {
            leaf_states.insert(
                node.guid.clone(),
                LeafState {
                    percentage_h: latest.get(&node.guid).map(|l| l.percentage_h),
                    weight_h: node.weight_h,
                },
            );
        }
    }

    Ok(rollup::compute_rollup(&nodes, &leaf_states, mode))
}

/// True iff any task strictly inside this task's bounds has recorded progress
pub async fn has_descendant_progress(db: &SqlitePool, task_guid: &str) -> Result<bool> {
    let task = tasks::get_task(db, task_guid).await?;

    let found: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM progress_entries p
            JOIN tasks t ON p.task_guid = t.guid
            WHERE t.project_guid = ?
              AND t.left_bound > ?
              AND t.right_bound < ?
        )
        "#,
    )
    .bind(&task.project_guid)
    .bind(task.left_bound)
    .bind(task.right_bound)
    .fetch_one(db)
    .await?;

    Ok(found)
}
