//! Datasets and their data items

use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::pagination::PageQuery;
use crate::response::Envelope;
use crate::services::datasets::{self, UploadedFile};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDatasetRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDatasetRequest {
    pub name: Option<String>,
}

/// GET /workspaces/:workspace_id/projects/:project_id/datasets
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let list = datasets::list(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Datasets retrieved", list))
}

/// GET .../datasets/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let stats = datasets::stats(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Dataset statistics retrieved", stats))
}

/// GET .../datasets/items
pub async fn project_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let items = datasets::list_items(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        None,
        page.into(),
    )
    .await?;
    Ok(Envelope::ok("Data items retrieved", items))
}

/// GET .../datasets/:dataset_id/items
pub async fn dataset_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, dataset_id)): Path<(String, String, String)>,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let items = datasets::list_items(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        Some(&dataset_id),
        page.into(),
    )
    .await?;
    Ok(Envelope::ok("Data items retrieved", items))
}

/// POST .../datasets
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    Json(request): Json<CreateDatasetRequest>,
) -> ApiResult<impl IntoResponse> {
    let dataset =
        datasets::create(&state.db, &user.id, &workspace_id, &project_id, &request.name).await?;
    Ok(Envelope::created("Dataset created", dataset))
}

/// PUT .../datasets/:dataset_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, dataset_id)): Path<(String, String, String)>,
    Json(request): Json<UpdateDatasetRequest>,
) -> ApiResult<impl IntoResponse> {
    let dataset = datasets::update(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        &dataset_id,
        request.name.as_deref(),
    )
    .await?;
    Ok(Envelope::ok("Dataset updated", dataset))
}

/// DELETE .../datasets/:dataset_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, dataset_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    datasets::delete(
        &state.db,
        state.store.as_ref(),
        &user.id,
        &workspace_id,
        &project_id,
        &dataset_id,
    )
    .await?;
    Ok(Envelope::ok("Dataset deleted", ()))
}

/// POST .../datasets/:dataset_id/items (multipart)
///
/// Every part that carries a file name is stored as one data item.
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, dataset_id)): Path<(String, String, String)>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(original_name) = field.file_name().map(str::to_string) else {
            debug!(field = ?field.name(), "Skipping multipart field without a file name");
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        files.push(UploadedFile {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let items = datasets::upload_items(
        &state.db,
        state.store.as_ref(),
        &user.id,
        &workspace_id,
        &project_id,
        &dataset_id,
        files,
    )
    .await?;
    Ok(Envelope::created("Files uploaded", items))
}

pub fn routes() -> Router<AppState> {
    let base = "/workspaces/:workspace_id/projects/:project_id/datasets";
    Router::new()
        .route(base, get(list).post(create))
        .route(&format!("{}/stats", base), get(stats))
        .route(&format!("{}/items", base), get(project_items))
        .route(&format!("{}/:dataset_id", base), put(update).delete(delete))
        .route(
            &format!("{}/:dataset_id/items", base),
            get(dataset_items).post(upload),
        )
}
