//! Task tree database access
//!
//! Each project owns one nested-set task tree, materialized from the
//! template catalog at project creation and numbered independently of every
//! other project and of the catalog itself.

use crate::db::models::{NodeFields, Task};
use crate::db::{projects, templates};
use crate::fixed;
use crate::normalize::{plan_normalization, LeafWeight, NormalizeOutcome};
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

type TaskRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    i64,
    i64,
    String,
    i64,
    Option<String>,
    i64,
    i64,
    i64,
);

const TASK_COLUMNS: &str = "guid, project_guid, template_guid, parent_guid, left_bound, \
     right_bound, name, volume_h, unit, price_h, weight_h, total_price_h";

fn row_to_task(row: TaskRow) -> Task {
    Task {
        guid: row.0,
        project_guid: row.1,
        template_guid: row.2,
        parent_guid: row.3,
        left_bound: row.4,
        right_bound: row.5,
        name: row.6,
        volume_h: row.7,
        unit: row.8,
        price_h: row.9,
        weight_h: row.10,
        total_price_h: row.11,
    }
}

/// Fetch one task by guid
pub async fn get_task(db: &SqlitePool, guid: &str) -> Result<Task> {
    let sql = format!("SELECT {} FROM tasks WHERE guid = ?", TASK_COLUMNS);
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(guid)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("task {}", guid)))?;

    Ok(row_to_task(row))
}

/// A project's full task tree, ordered by left bound ascending
pub async fn list_tasks(db: &SqlitePool, project_guid: &str) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE project_guid = ? ORDER BY left_bound",
        TASK_COLUMNS
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(project_guid)
        .fetch_all(db)
        .await?;

    Ok(rows.into_iter().map(row_to_task).collect())
}

/// Number of task rows a project currently holds
pub async fn count_tasks(db: &SqlitePool, project_guid: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_guid = ?")
        .bind(project_guid)
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Materialize the template catalog into a project's task tree
///
/// Walks the catalog in left-bound order so every parent is created before
/// its children; a running template→task map resolves each clone's parent.
/// Clones copy the template's attributes and its exact bounds - each
/// project's tree is numbered independently, so reusing the catalog
/// numbering is safe. All inserts run in one transaction.
///
/// Only idempotent on an empty tree: calling this twice duplicates tasks.
/// Callers guard with [`count_tasks`] or reset first.
pub async fn clone_templates_for_project(db: &SqlitePool, project_guid: &str) -> Result<usize> {
    // Surface a missing project as NotFound before touching the catalog
    let project = projects::get_project(db, project_guid).await?;

    let catalog = templates::list_templates(db).await?;
    if catalog.is_empty() {
        info!("Template catalog is empty, nothing to clone for {}", project.guid);
        return Ok(0);
    }

    let mut tx = db.begin().await?;
    let mut cloned: HashMap<String, String> = HashMap::new();

    for template in &catalog {
        let parent_task_guid = match &template.parent_guid {
            Some(parent) => Some(cloned.get(parent).cloned().ok_or_else(|| {
                Error::Internal(format!(
                    "template {} parent {} not yet cloned; catalog bounds are corrupt",
                    template.guid, parent
                ))
            })?),
            None => None,
        };

        let guid = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO tasks
                (guid, project_guid, template_guid, parent_guid, left_bound, right_bound,
                 name, volume_h, unit, price_h, weight_h, total_price_h)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&guid)
        .bind(project_guid)
        .bind(&template.guid)
        .bind(&parent_task_guid)
        .bind(template.left_bound)
        .bind(template.right_bound)
        .bind(&template.name)
        .bind(template.volume_h)
        .bind(&template.unit)
        .bind(template.price_h)
        .bind(template.weight_h)
        .bind(fixed::mul(template.price_h, template.volume_h))
        .execute(&mut *tx)
        .await?;

        cloned.insert(template.guid.clone(), guid);
    }

    tx.commit().await?;

    info!(
        "Cloned {} templates into project {}",
        cloned.len(),
        project.guid
    );
    Ok(cloned.len())
}

/// Delete all tasks of a project (reset/reseed flows)
///
/// Progress entries cascade with their tasks.
pub async fn delete_project_tasks(db: &SqlitePool, project_guid: &str) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM tasks WHERE project_guid = ?")
        .bind(project_guid)
        .execute(db)
        .await?
        .rows_affected();

    info!("Deleted {} tasks from project {}", deleted, project_guid);
    Ok(deleted)
}

/// Insert a manually-created task (no template backing)
///
/// Same shift-based bounds maintenance as the catalog, scoped to the
/// owning project's tree.
pub async fn insert_task(
    db: &SqlitePool,
    project_guid: &str,
    parent_guid: Option<&str>,
    fields: NodeFields,
) -> Result<Task> {
    fields.validate()?;
    projects::get_project(db, project_guid).await?;

    let guid = Uuid::new_v4().to_string();
    let mut tx = db.begin().await?;

    let (left, right) = match parent_guid {
        Some(parent) => {
            let parent_right: i64 = sqlx::query_scalar(
                "SELECT right_bound FROM tasks WHERE guid = ? AND project_guid = ?",
            )
            .bind(parent)
            .bind(project_guid)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {}", parent)))?;

            sqlx::query(
                "UPDATE tasks SET right_bound = right_bound + 2 \
                 WHERE project_guid = ? AND right_bound >= ?",
            )
            .bind(project_guid)
            .bind(parent_right)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "UPDATE tasks SET left_bound = left_bound + 2 \
                 WHERE project_guid = ? AND left_bound > ?",
            )
            .bind(project_guid)
            .bind(parent_right)
            .execute(&mut *tx)
            .await?;

            (parent_right, parent_right + 1)
        }
        None => {
            let max_right: Option<i64> =
                sqlx::query_scalar("SELECT MAX(right_bound) FROM tasks WHERE project_guid = ?")
                    .bind(project_guid)
                    .fetch_one(&mut *tx)
                    .await?;
            let left = max_right.unwrap_or(0) + 1;
            (left, left + 1)
        }
    };

    sqlx::query(
        r#"
        INSERT INTO tasks
            (guid, project_guid, template_guid, parent_guid, left_bound, right_bound,
             name, volume_h, unit, price_h, weight_h, total_price_h)
        VALUES (?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(project_guid)
    .bind(parent_guid)
    .bind(left)
    .bind(right)
    .bind(&fields.name)
    .bind(fields.volume_h)
    .bind(&fields.unit)
    .bind(fields.price_h)
    .bind(fields.weight_h)
    .bind(fixed::mul(fields.price_h, fields.volume_h))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_task(db, &guid).await
}

/// Update a task's attributes, recomputing the derived total price
pub async fn update_task(db: &SqlitePool, guid: &str, fields: NodeFields) -> Result<Task> {
    fields.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET name = ?, volume_h = ?, unit = ?, price_h = ?, weight_h = ?,
            total_price_h = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&fields.name)
    .bind(fields.volume_h)
    .bind(&fields.unit)
    .bind(fields.price_h)
    .bind(fields.weight_h)
    .bind(fixed::mul(fields.price_h, fields.volume_h))
    .bind(guid)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("task {}", guid)));
    }

    get_task(db, guid).await
}

/// Normalize one project's leaf-task weights so they sum to 100.00
pub async fn normalize_task_weights(
    db: &SqlitePool,
    project_guid: &str,
) -> Result<NormalizeOutcome> {
    projects::get_project(db, project_guid).await?;

    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT guid, weight_h FROM tasks
        WHERE project_guid = ?
          AND guid NOT IN (
            SELECT parent_guid FROM tasks
            WHERE project_guid = ? AND parent_guid IS NOT NULL
          )
        ORDER BY guid
        "#,
    )
    .bind(project_guid)
    .bind(project_guid)
    .fetch_all(db)
    .await?;

    let leaves: Vec<LeafWeight> = rows
        .into_iter()
        .map(|(guid, weight_h)| LeafWeight { guid, weight_h })
        .collect();

    let plan = plan_normalization(&leaves)?;

    let mut tx = db.begin().await?;
    for change in &plan.changes {
        sqlx::query("UPDATE tasks SET weight_h = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
            .bind(change.new_weight_h)
            .bind(&change.guid)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    let outcome = NormalizeOutcome::from_plan(&plan);
    if outcome.success {
        info!(
            "Normalized {} task weights in project {}, sum {:.2}",
            outcome.updated_count, project_guid, outcome.final_sum
        );
    } else {
        warn!(
            "Task weight normalization for project {} left sum at {:.2}",
            project_guid, outcome.final_sum
        );
    }
    Ok(outcome)
}
