//! annolab-api library - annotation platform HTTP service
//!
//! Users, workspaces and their members, projects, datasets of uploaded media,
//! class labels and the annotations drawn on each item.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use chrono::Duration;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

pub mod api;
pub mod auth;
pub mod error;
pub mod mail;
pub mod pagination;
pub mod response;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{ApiError, ApiResult};

use auth::TokenIssuer;
use mail::Mailer;
use storage::{local::FILES_ROUTE, ObjectStore};

/// Runtime settings derived from configuration at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base of links sent by email (the web client)
    pub client_domain: String,
    pub verification_ttl: Duration,
    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    /// Served at `/files` when uploads are stored on local disk
    pub local_files_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_domain: "http://localhost:3000".to_string(),
            verification_ttl: Duration::minutes(15),
            secure_cookie: false,
            max_upload_bytes: 50 * 1024 * 1024,
            cors_origins: vec!["http://localhost:3000".to_string()],
            local_files_root: None,
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: TokenIssuer,
    pub mailer: Arc<dyn Mailer>,
    pub store: Arc<dyn ObjectStore>,
    pub settings: Arc<Settings>,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tokens: TokenIssuer,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn ObjectStore>,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            tokens,
            mailer,
            store,
            settings: Arc::new(settings),
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
///
/// Health, registration, login and email verification are public; every
/// other route requires an access token.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(api::auth::protected_routes())
        .merge(api::users::routes())
        .merge(api::workspaces::routes())
        .merge(api::members::routes())
        .merge(api::invitations::routes())
        .merge(api::projects::routes())
        .merge(api::datasets::routes())
        .merge(api::data_items::routes())
        .merge(api::class_labels::routes())
        .merge(api::annotations::routes())
        .merge(api::dashboard::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let public = Router::new()
        .merge(api::auth::public_routes())
        .merge(api::health::health_routes());

    let mut router = Router::new().merge(protected).merge(public);
    if let Some(root) = &state.settings.local_files_root {
        router = router.nest_service(FILES_ROUTE, ServeDir::new(root));
    }

    let body_limit = DefaultBodyLimit::max(state.settings.max_upload_bytes);
    let cors = cors_layer(&state.settings.cors_origins);

    router
        .with_state(state)
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Credentialed CORS for the configured web client origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT_LANGUAGE,
        ])
}
