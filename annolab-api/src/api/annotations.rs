//! Annotations of a data item

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::annotations::{self, AnnotationInput};
use crate::AppState;

/// GET /workspaces/:workspace_id/projects/:project_id/items/:item_id/labels
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, item_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let list = annotations::list(&state.db, &user.id, &workspace_id, &project_id, &item_id).await?;
    Ok(Envelope::ok("Annotations retrieved", list))
}

/// POST .../labels/sync with the item's full annotation list
pub async fn sync(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, item_id)): Path<(String, String, String)>,
    Json(inputs): Json<Vec<AnnotationInput>>,
) -> ApiResult<impl IntoResponse> {
    let list = annotations::sync(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        &item_id,
        inputs,
    )
    .await?;
    Ok(Envelope::ok("Annotations synchronized", list))
}

pub fn routes() -> Router<AppState> {
    let base = "/workspaces/:workspace_id/projects/:project_id/items/:item_id/labels";
    Router::new()
        .route(base, get(list))
        .route(&format!("{}/sync", base), post(sync))
}
