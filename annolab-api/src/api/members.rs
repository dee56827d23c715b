//! Workspace members

use annolab_common::models::Role;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::members;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// GET /workspaces/:workspace_id/members
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let list = members::list(&state.db, &user.id, &workspace_id).await?;
    Ok(Envelope::ok("Members retrieved", list))
}

/// PATCH /workspaces/:workspace_id/members/:member_id
pub async fn update_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, member_id)): Path<(String, i64)>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let member =
        members::update_role(&state.db, &user.id, &workspace_id, member_id, request.role).await?;
    Ok(Envelope::ok("Member role updated", member))
}

/// DELETE /workspaces/:workspace_id/members/:member_id
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, member_id)): Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    members::remove(&state.db, &user.id, &workspace_id, member_id).await?;
    Ok(Envelope::ok("Member removed", ()))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workspaces/:workspace_id/members", get(list))
        .route(
            "/workspaces/:workspace_id/members/:member_id",
            patch(update_role).delete(remove),
        )
}
