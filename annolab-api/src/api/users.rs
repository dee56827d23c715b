//! The caller's account and profile

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use annolab_common::models::ProfileStatus;
use secrecy::SecretString;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::Envelope;
use crate::services::{profiles, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub profile_img: Option<String>,
    pub status: Option<ProfileStatus>,
}

/// GET /user/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let profile = users::get_with_profile(&state.db, &user.id).await?;
    Ok(Envelope::ok("User profile retrieved", profile))
}

/// POST /user/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    users::change_password(
        &state.db,
        &user.id,
        SecretString::from(request.current_password),
        request.new_password,
    )
    .await?;
    Ok(Envelope::ok("Password changed", ()))
}

/// PUT /user/profile
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = users::update_username(&state.db, &user.id, &request.username).await?;
    Ok(Envelope::ok("User updated", updated))
}

/// POST /profile
pub async fn save_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile = profiles::upsert(&state.db, &user.id, request.profile_img, request.status).await?;
    Ok(Envelope::ok("Profile saved", profile))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(get_profile).put(update_user))
        .route("/user/password", post(change_password))
        .route("/profile", post(save_profile))
}
