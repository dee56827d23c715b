//! Class labels of a project

use annolab_common::models::{ClassLabel, ClassType, Role};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::access::project_scope;
use crate::services::new_id;
use crate::validation::require_name;

#[derive(Debug, Default)]
pub struct ClassLabelChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub class_type: Option<ClassType>,
    pub color: Option<String>,
}

async fn require_label(
    db: &SqlitePool,
    project_id: &str,
    class_label_id: &str,
) -> ApiResult<ClassLabel> {
    sqlx::query_as::<_, ClassLabel>("SELECT * FROM class_labels WHERE id = ? AND project_id = ?")
        .bind(class_label_id)
        .bind(project_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Class label not found".to_string()))
}

pub async fn list(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<Vec<ClassLabel>> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;

    let labels = sqlx::query_as::<_, ClassLabel>(
        "SELECT * FROM class_labels WHERE project_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(labels)
}

pub async fn create(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    label: ClassLabelChanges,
) -> ApiResult<ClassLabel> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;

    let name = require_name(label.name.as_deref().unwrap_or_default(), "Label name")?;
    let color = require_name(label.color.as_deref().unwrap_or_default(), "Label color")?;

    let now = Utc::now();
    let created = sqlx::query_as::<_, ClassLabel>(
        "INSERT INTO class_labels (id, name, description, type, color, project_id,
                                   created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(new_id())
    .bind(&name)
    .bind(label.description)
    .bind(label.class_type.unwrap_or_default())
    .bind(&color)
    .bind(project_id)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await?;

    info!(class_label_id = %created.id, project_id, "Class label created");
    Ok(created)
}

pub async fn update(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    class_label_id: &str,
    changes: ClassLabelChanges,
) -> ApiResult<ClassLabel> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    require_label(db, project_id, class_label_id).await?;

    let name = changes
        .name
        .as_deref()
        .map(|n| require_name(n, "Label name"))
        .transpose()?;
    let color = changes
        .color
        .as_deref()
        .map(|c| require_name(c, "Label color"))
        .transpose()?;

    let updated = sqlx::query_as::<_, ClassLabel>(
        "UPDATE class_labels SET
             name = COALESCE(?, name),
             description = COALESCE(?, description),
             type = COALESCE(?, type),
             color = COALESCE(?, color),
             updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(name)
    .bind(changes.description)
    .bind(changes.class_type)
    .bind(color)
    .bind(Utc::now())
    .bind(class_label_id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

/// Remove a label, soft-deleting every annotation that used it
pub async fn delete(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    class_label_id: &str,
) -> ApiResult<()> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    require_label(db, project_id, class_label_id).await?;

    let now = Utc::now();
    let mut tx = db.begin().await?;

    let orphaned = sqlx::query(
        "UPDATE annotations
         SET class_label_id = NULL, is_deleted = 1, deleted_at = ?, updated_at = ?
         WHERE class_label_id = ?",
    )
    .bind(now)
    .bind(now)
    .bind(class_label_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM class_labels WHERE id = ?")
        .bind(class_label_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(class_label_id, orphaned, "Class label deleted");
    Ok(())
}
