//! Workspaces

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
use crate::services::workspaces;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkspaceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDefaultRequest {
    pub workspace_id: String,
}

/// POST /workspaces
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateWorkspaceRequest>,
) -> ApiResult<impl IntoResponse> {
    let workspace = workspaces::create(
        &state.db,
        &user.id,
        &request.name,
        request.description.as_deref(),
    )
    .await?;
    Ok(Envelope::created("Workspace created", workspace))
}

/// GET /workspaces
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let list = workspaces::list_for_user(&state.db, &user.id).await?;
    Ok(Envelope::ok("Workspaces retrieved", list))
}

/// GET /workspaces/default-workspace
pub async fn get_default(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let workspace = workspaces::get_default(&state.db, &user.id).await?;
    Ok(Envelope::ok("Default workspace retrieved", workspace))
}

/// POST /workspaces/set-default-workspace
pub async fn set_default(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SetDefaultRequest>,
) -> ApiResult<impl IntoResponse> {
    let workspace = workspaces::set_default(&state.db, &user.id, &request.workspace_id).await?;
    Ok(Envelope::ok("Default workspace set", workspace))
}

/// GET /workspaces/:workspace_id
pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let workspace = workspaces::get(&state.db, &user.id, &workspace_id).await?;
    Ok(Envelope::ok("Workspace retrieved", workspace))
}

/// PUT /workspaces/:workspace_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<String>,
    Json(request): Json<UpdateWorkspaceRequest>,
) -> ApiResult<impl IntoResponse> {
    let workspace = workspaces::update(
        &state.db,
        &user.id,
        &workspace_id,
        request.name.as_deref(),
        request.description.as_deref(),
    )
    .await?;
    Ok(Envelope::ok("Workspace updated", workspace))
}

/// DELETE /workspaces/:workspace_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    workspaces::delete(&state.db, &user.id, &workspace_id).await?;
    Ok(Envelope::ok("Workspace deleted", ()))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workspaces", post(create).get(list))
        .route("/workspaces/default-workspace", get(get_default))
        .route("/workspaces/set-default-workspace", post(set_default))
        .route(
            "/workspaces/:workspace_id",
            get(get_one).put(update).delete(delete),
        )
}
