//! Template catalog database access
//!
//! The catalog is a single process-wide nested-set tree. Structural
//! mutations renumber the bounds of everything at or after the mutation
//! point, inside one transaction, so the nested-set invariants hold after
//! every write.

use crate::db::models::{NodeFields, TemplateTask};
use crate::normalize::{plan_normalization, LeafWeight, NormalizeOutcome};
use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

type TemplateRow = (
    String,
    Option<String>,
    i64,
    i64,
    String,
    i64,
    Option<String>,
    i64,
    i64,
);

const TEMPLATE_COLUMNS: &str =
    "guid, parent_guid, left_bound, right_bound, name, volume_h, unit, price_h, weight_h";

fn row_to_template(row: TemplateRow) -> TemplateTask {
    TemplateTask {
        guid: row.0,
        parent_guid: row.1,
        left_bound: row.2,
        right_bound: row.3,
        name: row.4,
        volume_h: row.5,
        unit: row.6,
        price_h: row.7,
        weight_h: row.8,
    }
}

/// Fetch one template by guid
pub async fn get_template(db: &SqlitePool, guid: &str) -> Result<TemplateTask> {
    let sql = format!(
        "SELECT {} FROM template_tasks WHERE guid = ?",
        TEMPLATE_COLUMNS
    );
    let row = sqlx::query_as::<_, TemplateRow>(&sql)
        .bind(guid)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("template {}", guid)))?;

    Ok(row_to_template(row))
}

/// The full catalog, ordered by left bound ascending
///
/// Left-bound order guarantees parents come before their descendants,
/// which the cloner relies on.
pub async fn list_templates(db: &SqlitePool) -> Result<Vec<TemplateTask>> {
    let sql = format!(
        "SELECT {} FROM template_tasks ORDER BY left_bound",
        TEMPLATE_COLUMNS
    );
    let rows = sqlx::query_as::<_, TemplateRow>(&sql).fetch_all(db).await?;

    Ok(rows.into_iter().map(row_to_template).collect())
}

/// Insert a template as the last child of `parent_guid`, or as a trailing
/// root when no parent is given
///
/// Bounds at or after the insertion point shift by 2 so the nested-set
/// invariants keep holding. The shift and the insert happen in one
/// transaction.
pub async fn insert_template(
    db: &SqlitePool,
    parent_guid: Option<&str>,
    fields: NodeFields,
) -> Result<TemplateTask> {
    fields.validate()?;

    let guid = Uuid::new_v4().to_string();
    let mut tx = db.begin().await?;

    let (left, right) = match parent_guid {
        Some(parent) => {
            let parent_right: i64 =
                sqlx::query_scalar("SELECT right_bound FROM template_tasks WHERE guid = ?")
                    .bind(parent)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("template {}", parent)))?;

            // Right bounds shift before left bounds, otherwise a shifted
            // node could momentarily invert its interval and trip the CHECK
            sqlx::query("UPDATE template_tasks SET right_bound = right_bound + 2 WHERE right_bound >= ?")
                .bind(parent_right)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE template_tasks SET left_bound = left_bound + 2 WHERE left_bound > ?")
                .bind(parent_right)
                .execute(&mut *tx)
                .await?;

            (parent_right, parent_right + 1)
        }
        None => {
            let max_right: Option<i64> =
                sqlx::query_scalar("SELECT MAX(right_bound) FROM template_tasks")
                    .fetch_one(&mut *tx)
                    .await?;
            let left = max_right.unwrap_or(0) + 1;
            (left, left + 1)
        }
    };

    sqlx::query(
        r#"
        INSERT INTO template_tasks
            (guid, parent_guid, left_bound, right_bound, name, volume_h, unit, price_h, weight_h)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(parent_guid)
    .bind(left)
    .bind(right)
    .bind(&fields.name)
    .bind(fields.volume_h)
    .bind(&fields.unit)
    .bind(fields.price_h)
    .bind(fields.weight_h)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_template(db, &guid).await
}

/// Update a template's attributes (structure untouched)
pub async fn update_template(db: &SqlitePool, guid: &str, fields: NodeFields) -> Result<TemplateTask> {
    fields.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE template_tasks
        SET name = ?, volume_h = ?, unit = ?, price_h = ?, weight_h = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&fields.name)
    .bind(fields.volume_h)
    .bind(&fields.unit)
    .bind(fields.price_h)
    .bind(fields.weight_h)
    .bind(guid)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("template {}", guid)));
    }

    get_template(db, guid).await
}

/// Delete a template and its whole subtree, closing the bounds gap
///
/// Returns the number of deleted nodes.
pub async fn delete_template_subtree(db: &SqlitePool, guid: &str) -> Result<u64> {
    let mut tx = db.begin().await?;

    let (left, right) = sqlx::query_as::<_, (i64, i64)>(
        "SELECT left_bound, right_bound FROM template_tasks WHERE guid = ?",
    )
    .bind(guid)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("template {}", guid)))?;

    let width = right - left + 1;

    let deleted = sqlx::query("DELETE FROM template_tasks WHERE left_bound >= ? AND right_bound <= ?")
        .bind(left)
        .bind(right)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    // Left bounds shift down before right bounds, mirroring the insert
    // order, so no interval inverts while the gap closes
    sqlx::query("UPDATE template_tasks SET left_bound = left_bound - ? WHERE left_bound > ?")
        .bind(width)
        .bind(right)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE template_tasks SET right_bound = right_bound - ? WHERE right_bound > ?")
        .bind(width)
        .bind(right)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("Deleted template subtree {} ({} nodes)", guid, deleted);
    Ok(deleted)
}

/// Normalize the catalog's leaf weights so they sum to 100.00
///
/// Operator-triggered maintenance action. Persists only weights that
/// actually change, in one transaction, and reports the outcome.
pub async fn normalize_template_weights(db: &SqlitePool) -> Result<NormalizeOutcome> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT guid, weight_h FROM template_tasks
        WHERE guid NOT IN (
            SELECT parent_guid FROM template_tasks WHERE parent_guid IS NOT NULL
        )
        ORDER BY guid
        "#,
    )
    .fetch_all(db)
    .await?;

    let leaves: Vec<LeafWeight> = rows
        .into_iter()
        .map(|(guid, weight_h)| LeafWeight { guid, weight_h })
        .collect();

    let plan = plan_normalization(&leaves)?;

    let mut tx = db.begin().await?;
    for change in &plan.changes {
        sqlx::query(
            "UPDATE template_tasks SET weight_h = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
        )
        .bind(change.new_weight_h)
        .bind(&change.guid)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let outcome = NormalizeOutcome::from_plan(&plan);
    if outcome.success {
        info!(
            "Normalized {} template weights, sum {:.2}",
            outcome.updated_count, outcome.final_sum
        );
    } else {
        warn!(
            "Template weight normalization left sum at {:.2} after updating {} weights",
            outcome.final_sum, outcome.updated_count
        );
    }
    Ok(outcome)
}
