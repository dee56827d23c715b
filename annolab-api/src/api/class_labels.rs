//! Class labels

use annolab_common::models::ClassType;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::class_labels::{self, ClassLabelChanges};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassLabelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub class_type: Option<ClassType>,
    pub color: Option<String>,
}

impl From<ClassLabelRequest> for ClassLabelChanges {
    fn from(r: ClassLabelRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            class_type: r.class_type,
            color: r.color,
        }
    }
}

/// GET /workspaces/:workspace_id/projects/:project_id/class-labels
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let labels = class_labels::list(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Class labels retrieved", labels))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    Json(request): Json<ClassLabelRequest>,
) -> ApiResult<impl IntoResponse> {
    let label = class_labels::create(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        request.into(),
    )
    .await?;
    Ok(Envelope::created("Class label created", label))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, class_label_id)): Path<(String, String, String)>,
    Json(request): Json<ClassLabelRequest>,
) -> ApiResult<impl IntoResponse> {
    let label = class_labels::update(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        &class_label_id,
        request.into(),
    )
    .await?;
    Ok(Envelope::ok("Class label updated", label))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id, class_label_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    class_labels::delete(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        &class_label_id,
    )
    .await?;
    Ok(Envelope::ok("Class label deleted", ()))
}

pub fn routes() -> Router<AppState> {
    let base = "/workspaces/:workspace_id/projects/:project_id/class-labels";
    Router::new()
        .route(base, get(list).post(create))
        .route(
            &format!("{}/:class_label_id", base),
            put(update).delete(delete),
        )
}
