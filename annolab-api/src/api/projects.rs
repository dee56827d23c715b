//! Projects

use annolab_common::models::ContentType;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::pagination::Pagination;
use crate::response::Envelope;
use crate::services::projects::{self, ProjectFilter, SortOrder};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "content_type", alias = "contentType", default)]
    pub content_type: ContentType,
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Query string of the project listing
///
/// Page fields are spelled out rather than flattened from `PageQuery`;
/// flattened structs lose numeric parsing in query strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub workspace_id: String,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub order: SortOrder,
}

/// POST /projects
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let project = projects::create(
        &state.db,
        &user.id,
        &request.workspace_id,
        &request.name,
        request.description.as_deref(),
        request.content_type,
    )
    .await?;
    Ok(Envelope::created("Project created", project))
}

/// GET /projects?workspaceId=&search=&page=&limit=&order=
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = ProjectFilter {
        search: query.search,
        order: query.order,
    };
    let pagination = Pagination::new(query.page, query.limit);
    let list = projects::list(&state.db, &user.id, &query.workspace_id, &filter, pagination).await?;
    Ok(Envelope::ok("Projects retrieved", list))
}

/// GET /projects/:project_id
pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = projects::get(&state.db, &user.id, &project_id).await?;
    Ok(Envelope::ok("Project retrieved", project))
}

/// PUT /workspaces/:workspace_id/projects/:project_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let project = projects::update(
        &state.db,
        &user.id,
        &workspace_id,
        &project_id,
        request.name.as_deref(),
        request.description.as_deref(),
    )
    .await?;
    Ok(Envelope::ok("Project updated", project))
}

/// DELETE /workspaces/:workspace_id/projects/:project_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    projects::delete(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Project deleted", ()))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create).get(list))
        .route("/projects/:project_id", get(get_one))
        .route(
            "/workspaces/:workspace_id/projects/:project_id",
            put(update).delete(delete),
        )
}
