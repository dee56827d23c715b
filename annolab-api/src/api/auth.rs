//! Registration, login, logout and email verification

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::request_language;
use crate::auth::middleware::{cleared_cookie, session_cookie};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::Envelope;
use crate::services::{auth, users};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub birthdate: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = auth::register(
        &state,
        auth::Registration {
            email: request.email,
            username: request.username,
            password: request.password,
            birthdate: request.birthdate,
        },
        request_language(&headers),
    )
    .await?;
    Ok(Envelope::created("Registration successful", user))
}

/// POST /auth/login
///
/// The token is returned in the body and also set as an HttpOnly cookie.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let token = auth::login(
        &state,
        &request.email,
        request.password,
        request_language(&headers),
    )
    .await?;

    let cookie = session_cookie(
        &token.access_token,
        token.expires_in,
        state.settings.secure_cookie,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Envelope::ok("Login successful", token),
    ))
}

/// POST /auth/logout
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cleared_cookie())],
        Envelope::ok("Logout successful", ()),
    )
}

/// GET /auth/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let profile = users::get_with_profile(&state.db, &user.id).await?;
    Ok(Envelope::ok("Profile retrieved", profile))
}

/// POST /auth/resend-verification-email
pub async fn resend_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResendRequest>,
) -> ApiResult<impl IntoResponse> {
    auth::resend_verification(&state, &request.email, request_language(&headers)).await?;
    Ok(Envelope::ok("Verification email sent", ()))
}

/// GET /auth/verify-email?token=
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<impl IntoResponse> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Verification token is missing".to_string()))?;
    auth::verify_email(&state.db, &token).await?;
    Ok(Envelope::ok("Email verified", ()))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/resend-verification-email", post(resend_verification))
        .route("/auth/verify-email", get(verify_email))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile))
}
