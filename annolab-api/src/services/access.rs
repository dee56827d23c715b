//! Workspace membership and role checks
//!
//! Every workspace-scoped operation starts with [`require_member`] (or
//! [`project_scope`] for project routes) and, when it changes data, follows
//! with [`require_role`].

use annolab_common::models::{Project, Role, WorkspaceMember};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// The caller's membership together with the project a route addresses
#[derive(Debug, Clone)]
pub struct ProjectScope {
    pub member: WorkspaceMember,
    pub project: Project,
}

pub async fn find_member(
    db: &SqlitePool,
    workspace_id: &str,
    user_id: &str,
) -> ApiResult<Option<WorkspaceMember>> {
    let member = sqlx::query_as::<_, WorkspaceMember>(
        "SELECT * FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(member)
}

pub async fn workspace_exists(db: &SqlitePool, workspace_id: &str) -> ApiResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?)")
        .bind(workspace_id)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

/// Membership row of `user_id` in `workspace_id`
///
/// 404 when the workspace does not exist, 403 when the user is not a member.
pub async fn require_member(
    db: &SqlitePool,
    workspace_id: &str,
    user_id: &str,
) -> ApiResult<WorkspaceMember> {
    if let Some(member) = find_member(db, workspace_id, user_id).await? {
        return Ok(member);
    }

    if !workspace_exists(db, workspace_id).await? {
        return Err(ApiError::NotFound("Workspace not found".to_string()));
    }

    debug!(workspace_id, user_id, "Access denied: not a member");
    Err(ApiError::Forbidden(
        "You are not a member of this workspace".to_string(),
    ))
}

pub fn require_role(member: &WorkspaceMember, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&member.role) {
        Ok(())
    } else {
        debug!(
            member_id = member.id,
            role = %member.role,
            "Access denied: insufficient role"
        );
        Err(ApiError::Forbidden("Insufficient permissions".to_string()))
    }
}

/// Project that must belong to `workspace_id`
pub async fn require_project(
    db: &SqlitePool,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<Project> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    if project.workspace_id != workspace_id {
        return Err(ApiError::NotFound(
            "Project not found in this workspace".to_string(),
        ));
    }

    Ok(project)
}

/// Membership check, optional role check, and project lookup in one go
pub async fn project_scope(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    allowed: Option<&[Role]>,
) -> ApiResult<ProjectScope> {
    let member = require_member(db, workspace_id, user_id).await?;
    if let Some(allowed) = allowed {
        require_role(&member, allowed)?;
    }
    let project = require_project(db, workspace_id, project_id).await?;
    Ok(ProjectScope { member, project })
}
