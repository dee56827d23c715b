//! Workspace membership management

use annolab_common::models::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::access::{require_member, require_role};

/// Member row joined with the user it belongs to
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub id: i64,
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const MEMBER_DETAIL_SELECT: &str = "SELECT m.id, m.user_id, m.workspace_id, m.role, u.email, u.username,
        m.created_at, m.updated_at
 FROM workspace_members m JOIN users u ON u.id = m.user_id";

async fn require_target(
    db: &SqlitePool,
    workspace_id: &str,
    member_id: i64,
) -> ApiResult<MemberDetail> {
    sqlx::query_as::<_, MemberDetail>(&format!(
        "{} WHERE m.id = ? AND m.workspace_id = ?",
        MEMBER_DETAIL_SELECT
    ))
    .bind(member_id)
    .bind(workspace_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))
}

pub async fn list(db: &SqlitePool, user_id: &str, workspace_id: &str) -> ApiResult<Vec<MemberDetail>> {
    require_member(db, workspace_id, user_id).await?;

    let members = sqlx::query_as::<_, MemberDetail>(&format!(
        "{} WHERE m.workspace_id = ? ORDER BY m.created_at ASC, m.id ASC",
        MEMBER_DETAIL_SELECT
    ))
    .bind(workspace_id)
    .fetch_all(db)
    .await?;
    Ok(members)
}

/// Change a member's role; only the owner may, and ownership never moves
pub async fn update_role(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    member_id: i64,
    role: Role,
) -> ApiResult<MemberDetail> {
    let caller = require_member(db, workspace_id, user_id).await?;
    require_role(&caller, &[Role::Owner])?;

    if role == Role::Owner {
        return Err(ApiError::BadRequest(
            "The OWNER role cannot be assigned".to_string(),
        ));
    }
    let target = require_target(db, workspace_id, member_id).await?;
    if target.role == Role::Owner {
        return Err(ApiError::Forbidden(
            "The workspace owner's role cannot be changed".to_string(),
        ));
    }

    sqlx::query("UPDATE workspace_members SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(Utc::now())
        .bind(member_id)
        .execute(db)
        .await?;

    info!(workspace_id, member_id, role = %role, "Member role changed");
    require_target(db, workspace_id, member_id).await
}

pub async fn remove(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    member_id: i64,
) -> ApiResult<()> {
    let caller = require_member(db, workspace_id, user_id).await?;
    require_role(&caller, Role::MANAGERS)?;

    let target = require_target(db, workspace_id, member_id).await?;
    if target.role == Role::Owner {
        return Err(ApiError::Forbidden(
            "The workspace owner cannot be removed".to_string(),
        ));
    }

    sqlx::query("DELETE FROM workspace_members WHERE id = ?")
        .bind(member_id)
        .execute(db)
        .await?;

    info!(workspace_id, member_id, removed_user = %target.user_id, "Member removed");
    Ok(())
}
