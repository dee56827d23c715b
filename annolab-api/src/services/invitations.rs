//! Invitations into a workspace
//!
//! An invitation is addressed by email. When an account with that email
//! already exists it is linked right away, so the invitee can see it in
//! their pending list whichever address lookup matches.

use annolab_common::models::{Invitation, Role};
use chrono::Utc;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::mail::templates::invitation_email;
use crate::services::access::{find_member, require_member, require_role};
use crate::services::{users, workspaces};
use crate::validation::validate_email;
use crate::AppState;

/// Pending invitation with the name of the workspace it leads to
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvitation {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub invitation: Invitation,
    pub workspace_name: String,
}

pub async fn create(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
    email: &str,
    role: Option<Role>,
) -> ApiResult<Invitation> {
    let caller = require_member(&state.db, workspace_id, user_id).await?;
    require_role(&caller, Role::MANAGERS)?;

    let role = role.unwrap_or(Role::Worker);
    if role == Role::Owner {
        return Err(ApiError::BadRequest(
            "Invitations cannot grant the OWNER role".to_string(),
        ));
    }

    let email = email.trim().to_ascii_lowercase();
    validate_email(&email)?;

    let invited = users::find_by_email(&state.db, &email).await?;
    if let Some(user) = &invited {
        if find_member(&state.db, workspace_id, &user.id).await?.is_some() {
            return Err(ApiError::Conflict(
                "User is already a member of this workspace".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let invitation = sqlx::query_as::<_, Invitation>(
        "INSERT INTO invitations (invited_user_id, email, workspace_id, role, accepted,
                                  created_at, updated_at)
         VALUES (?, ?, ?, ?, 0, ?, ?)
         RETURNING *",
    )
    .bind(invited.as_ref().map(|u| u.id.as_str()))
    .bind(&email)
    .bind(workspace_id)
    .bind(role)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    let workspace_name: String = sqlx::query_scalar("SELECT name FROM workspaces WHERE id = ?")
        .bind(workspace_id)
        .fetch_one(&state.db)
        .await?;
    let message = invitation_email(
        &email,
        &workspace_name,
        role.as_str(),
        &state.settings.client_domain,
    );
    if let Err(e) = state.mailer.send(message).await {
        warn!(invitation_id = invitation.id, "Failed to send invitation email: {:#}", e);
    }

    info!(invitation_id = invitation.id, workspace_id, role = %role, "Invitation created");
    Ok(invitation)
}

pub async fn list_for_workspace(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
) -> ApiResult<Vec<Invitation>> {
    let caller = require_member(db, workspace_id, user_id).await?;
    require_role(&caller, Role::MANAGERS)?;

    let invitations = sqlx::query_as::<_, Invitation>(
        "SELECT * FROM invitations WHERE workspace_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(workspace_id)
    .fetch_all(db)
    .await?;
    Ok(invitations)
}

/// Invitations addressed to the caller that are not accepted yet
pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> ApiResult<Vec<PendingInvitation>> {
    let user = users::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let invitations = sqlx::query_as::<_, PendingInvitation>(
        "SELECT i.*, w.name AS workspace_name
         FROM invitations i JOIN workspaces w ON w.id = i.workspace_id
         WHERE i.accepted = 0 AND (i.invited_user_id = ? OR i.email = ?)
         ORDER BY i.created_at DESC, i.id DESC",
    )
    .bind(&user.id)
    .bind(&user.email)
    .fetch_all(db)
    .await?;
    Ok(invitations)
}

/// Join the invited workspace with the invited role
pub async fn accept(db: &SqlitePool, user_id: &str, invitation_id: i64) -> ApiResult<Invitation> {
    let user = users::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = ?")
        .bind(invitation_id)
        .fetch_optional(db)
        .await?
        .filter(|i| i.invited_user_id.as_deref() == Some(user.id.as_str()) || i.email == user.email)
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    if invitation.accepted {
        return Err(ApiError::BadRequest(
            "Invitation has already been accepted".to_string(),
        ));
    }
    if find_member(db, &invitation.workspace_id, &user.id).await?.is_some() {
        return Err(ApiError::Conflict(
            "You are already a member of this workspace".to_string(),
        ));
    }

    let mut tx = db.begin().await?;
    workspaces::insert_member(&mut tx, &user.id, &invitation.workspace_id, invitation.role).await?;
    let accepted = sqlx::query_as::<_, Invitation>(
        "UPDATE invitations SET accepted = 1, invited_user_id = ?, updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&user.id)
    .bind(Utc::now())
    .bind(invitation_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        invitation_id,
        workspace_id = %accepted.workspace_id,
        user_id,
        "Invitation accepted"
    );
    Ok(accepted)
}
