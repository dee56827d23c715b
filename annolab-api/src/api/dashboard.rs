//! Project dashboard

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::dashboard;
use crate::AppState;

type ProjectPath = Path<(String, String)>;

/// GET /workspaces/:workspace_id/projects/:project_id/dashboard/overview
pub async fn overview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): ProjectPath,
) -> ApiResult<impl IntoResponse> {
    let overview = dashboard::overview(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Project overview retrieved", overview))
}

pub async fn info(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): ProjectPath,
) -> ApiResult<impl IntoResponse> {
    let info = dashboard::info(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Project info retrieved", info))
}

pub async fn statistics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, project_id)): ProjectPath,
) -> ApiResult<impl IntoResponse> {
    let stats = dashboard::statistics(&state.db, &user.id, &workspace_id, &project_id).await?;
    Ok(Envelope::ok("Project statistics retrieved", stats))
}

pub fn routes() -> Router<AppState> {
    let base = "/workspaces/:workspace_id/projects/:project_id/dashboard";
    Router::new()
        .route(&format!("{}/overview", base), get(overview))
        .route(&format!("{}/info", base), get(info))
        .route(&format!("{}/statistics", base), get(statistics))
}
