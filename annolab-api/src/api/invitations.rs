//! Workspace invitations

use annolab_common::models::Role;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::invitations;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Option<Role>,
}

/// POST /workspaces/:workspace_id/invitations
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<String>,
    Json(request): Json<InviteRequest>,
) -> ApiResult<impl IntoResponse> {
    let invitation =
        invitations::create(&state, &user.id, &workspace_id, &request.email, request.role).await?;
    Ok(Envelope::created("Invitation sent", invitation))
}

/// GET /workspaces/:workspace_id/invitations
pub async fn list_for_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let list = invitations::list_for_workspace(&state.db, &user.id, &workspace_id).await?;
    Ok(Envelope::ok("Invitations retrieved", list))
}

/// GET /invitations
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let list = invitations::list_for_user(&state.db, &user.id).await?;
    Ok(Envelope::ok("Pending invitations retrieved", list))
}

/// POST /invitations/:invitation_id/accept
pub async fn accept(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(invitation_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let invitation = invitations::accept(&state.db, &user.id, invitation_id).await?;
    Ok(Envelope::ok("Invitation accepted", invitation))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/workspaces/:workspace_id/invitations",
            post(create).get(list_for_workspace),
        )
        .route("/invitations", get(list_mine))
        .route("/invitations/:invitation_id/accept", post(accept))
}
