//! Individual data items of a project

use annolab_common::models::DataItemStatus;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::data_items;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: DataItemStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItemsRequest {
    #[serde(default)]
    pub item_ids: Vec<String>,
}

type ItemPath = Path<(String, String, String)>;

/// GET /workspaces/:workspace_id/projects/:project_id/items/:item_id
pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, item_id)): ItemPath,
) -> ApiResult<impl IntoResponse> {
    let item = data_items::get(&state.db, &user.id, &workspace_id, &project_id, &item_id).await?;
    Ok(Envelope::ok("Data item retrieved", item))
}

/// PUT .../items/:item_id
pub async fn rename(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, item_id)): ItemPath,
    Json(request): Json<RenameRequest>,
) -> ApiResult<impl IntoResponse> {
    let item = data_items::rename(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        &item_id,
        request.name.as_deref(),
    )
    .await?;
    Ok(Envelope::ok("Data item updated", item))
}

/// PATCH .../items/:item_id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, item_id)): ItemPath,
    Json(request): Json<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let item = data_items::update_status(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        &item_id,
        request.status,
    )
    .await?;
    Ok(Envelope::ok("Data item status updated", item))
}

/// GET .../items/:item_id/navigation
pub async fn navigation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, item_id)): ItemPath,
) -> ApiResult<impl IntoResponse> {
    let nav =
        data_items::navigation(&state.db, &user.id, &workspace_id, &project_id, &item_id).await?;
    Ok(Envelope::ok("Navigation retrieved", nav))
}

/// DELETE .../items with `{"itemIds": [...]}`
pub async fn delete_many(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    Json(request): Json<DeleteItemsRequest>,
) -> ApiResult<impl IntoResponse> {
    let deleted = data_items::delete_many(
        &state.db,
        state.store.as_ref(),
        &user.id,
        &workspace_id,
        &project_id,
        &request.item_ids,
    )
    .await?;
    Ok(Envelope::ok("Data items deleted", deleted))
}

pub fn routes() -> Router<AppState> {
    let base = "/workspaces/:workspace_id/projects/:project_id/items";
    Router::new()
        .route(base, delete(delete_many))
        .route(&format!("{}/:item_id", base), get(get_one).put(rename))
        .route(&format!("{}/:item_id/status", base), patch(update_status))
        .route(&format!("{}/:item_id/navigation", base), get(navigation))
}
