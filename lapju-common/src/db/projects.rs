//! Project database access

use crate::db::models::Project;
use crate::{Error, Result};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create a new project
///
/// Cloning the template catalog into the new project is a separate step
/// fired by the project-creation lifecycle hook, see
/// [`crate::db::tasks::clone_templates_for_project`].
pub async fn create_project(
    db: &SqlitePool,
    name: &str,
    location: Option<&str>,
    start_date: Option<NaiveDate>,
) -> Result<Project> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "project name must not be empty"));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO projects (guid, name, location, start_date)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(name)
    .bind(location)
    .bind(start_date)
    .execute(db)
    .await?;

    get_project(db, &guid).await
}

/// Fetch one project by guid
pub async fn get_project(db: &SqlitePool, guid: &str) -> Result<Project> {
    let row = sqlx::query_as::<_, (String, String, Option<String>, Option<NaiveDate>)>(
        "SELECT guid, name, location, start_date FROM projects WHERE guid = ?",
    )
    .bind(guid)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("project {}", guid)))?;

    Ok(Project {
        guid: row.0,
        name: row.1,
        location: row.2,
        start_date: row.3,
    })
}

/// All projects, oldest first
pub async fn list_projects(db: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, (String, String, Option<String>, Option<NaiveDate>)>(
        "SELECT guid, name, location, start_date FROM projects ORDER BY created_at, guid",
    )
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Project {
            guid: row.0,
            name: row.1,
            location: row.2,
            start_date: row.3,
        })
        .collect())
}
