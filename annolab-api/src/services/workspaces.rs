//! Workspaces and the user's default workspace

use annolab_common::models::{Plan, Role, Workspace, WorkspaceMember};
use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::access::{require_member, require_role};
use crate::services::new_id;
use crate::validation::validate_workspace_name;

/// Workspace listing entry with the caller's role in it
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceWithRole {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub workspace: Workspace,
    pub role: Role,
}

pub async fn insert_workspace(
    conn: &mut SqliteConnection,
    owner_id: &str,
    name: &str,
    description: Option<&str>,
) -> ApiResult<Workspace> {
    let now = Utc::now();
    let workspace = sqlx::query_as::<_, Workspace>(
        "INSERT INTO workspaces (id, name, description, plan, owner_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(new_id())
    .bind(name)
    .bind(description)
    .bind(Plan::Free)
    .bind(owner_id)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(workspace)
}

pub async fn insert_member(
    conn: &mut SqliteConnection,
    user_id: &str,
    workspace_id: &str,
    role: Role,
) -> ApiResult<WorkspaceMember> {
    let now = Utc::now();
    let member = sqlx::query_as::<_, WorkspaceMember>(
        "INSERT INTO workspace_members (user_id, workspace_id, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(user_id)
    .bind(workspace_id)
    .bind(role)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(member)
}

/// Create a workspace with the caller as its OWNER member
pub async fn create(
    db: &SqlitePool,
    user_id: &str,
    name: &str,
    description: Option<&str>,
) -> ApiResult<Workspace> {
    let name = validate_workspace_name(name)?;

    let mut tx = db.begin().await?;
    let workspace = insert_workspace(&mut tx, user_id, &name, description).await?;
    insert_member(&mut tx, user_id, &workspace.id, Role::Owner).await?;
    tx.commit().await?;

    info!(workspace_id = %workspace.id, user_id, "Workspace created");
    Ok(workspace)
}

pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> ApiResult<Vec<WorkspaceWithRole>> {
    let workspaces = sqlx::query_as::<_, WorkspaceWithRole>(
        "SELECT w.*, m.role
         FROM workspaces w
         JOIN workspace_members m ON m.workspace_id = w.id
         WHERE m.user_id = ?
         ORDER BY w.created_at ASC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(workspaces)
}

async fn find(db: &SqlitePool, workspace_id: &str) -> ApiResult<Option<Workspace>> {
    let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
        .bind(workspace_id)
        .fetch_optional(db)
        .await?;
    Ok(workspace)
}

/// Oldest workspace the user owns
async fn first_owned(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> ApiResult<Option<String>> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM workspaces WHERE owner_id = ? ORDER BY created_at ASC, id ASC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}

/// The user's default workspace
///
/// When none is set, the first workspace the user owns becomes the default
/// and is persisted.
pub async fn get_default(db: &SqlitePool, user_id: &str) -> ApiResult<Workspace> {
    let current = sqlx::query_scalar::<_, Option<String>>(
        "SELECT default_workspace_id FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .flatten();

    if let Some(workspace_id) = current {
        if let Some(workspace) = find(db, &workspace_id).await? {
            return Ok(workspace);
        }
    }

    let mut conn = db.acquire().await?;
    let fallback = first_owned(&mut conn, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No default workspace".to_string()))?;
    drop(conn);

    sqlx::query("UPDATE users SET default_workspace_id = ?, updated_at = ? WHERE id = ?")
        .bind(&fallback)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;

    find(db, &fallback)
        .await?
        .ok_or_else(|| ApiError::NotFound("No default workspace".to_string()))
}

pub async fn set_default(db: &SqlitePool, user_id: &str, workspace_id: &str) -> ApiResult<Workspace> {
    let workspace = find(db, workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workspace not found".to_string()))?;
    require_member(db, workspace_id, user_id).await?;

    sqlx::query("UPDATE users SET default_workspace_id = ?, updated_at = ? WHERE id = ?")
        .bind(workspace_id)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(workspace)
}

/// A workspace the caller belongs to
///
/// Non-members get the same 404 as a missing workspace.
pub async fn get(db: &SqlitePool, user_id: &str, workspace_id: &str) -> ApiResult<Workspace> {
    let workspace = sqlx::query_as::<_, Workspace>(
        "SELECT w.* FROM workspaces w
         JOIN workspace_members m ON m.workspace_id = w.id
         WHERE w.id = ? AND m.user_id = ?",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    workspace.ok_or_else(|| ApiError::NotFound("Workspace not found".to_string()))
}

pub async fn update(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> ApiResult<Workspace> {
    let member = require_member(db, workspace_id, user_id).await?;
    require_role(&member, Role::MANAGERS)?;

    let name = name.map(validate_workspace_name).transpose()?;

    let workspace = sqlx::query_as::<_, Workspace>(
        "UPDATE workspaces SET
             name = COALESCE(?, name),
             description = COALESCE(?, description),
             updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(name)
    .bind(description)
    .bind(Utc::now())
    .bind(workspace_id)
    .fetch_one(db)
    .await?;

    Ok(workspace)
}

/// Delete a workspace (owner only) and repair default workspaces
///
/// Users whose default pointed here are moved to the first workspace they
/// still own, or left without a default.
pub async fn delete(db: &SqlitePool, user_id: &str, workspace_id: &str) -> ApiResult<()> {
    let workspace = find(db, workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workspace not found".to_string()))?;
    if workspace.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "Only the workspace owner can delete it".to_string(),
        ));
    }

    let mut tx = db.begin().await?;

    let affected: Vec<String> =
        sqlx::query_scalar("SELECT id FROM users WHERE default_workspace_id = ?")
            .bind(workspace_id)
            .fetch_all(&mut *tx)
            .await?;

    sqlx::query("DELETE FROM workspaces WHERE id = ?")
        .bind(workspace_id)
        .execute(&mut *tx)
        .await?;

    let now = Utc::now();
    for affected_user in &affected {
        let replacement = first_owned(&mut tx, affected_user).await?;
        sqlx::query("UPDATE users SET default_workspace_id = ?, updated_at = ? WHERE id = ?")
            .bind(replacement)
            .bind(now)
            .bind(affected_user)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(workspace_id, reassigned = affected.len(), "Workspace deleted");
    Ok(())
}
