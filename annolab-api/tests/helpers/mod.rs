//! Shared fixtures for the HTTP integration tests
//!
//! Every test gets its own in-memory database, a mailer that records what
//! it would have sent, and a local object store in a temporary directory.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use annolab_api::auth::TokenIssuer;
use annolab_api::mail::{Email, Mailer};
use annolab_api::storage::LocalStore;
use annolab_api::{build_router, AppState, Settings};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123!";
pub const MULTIPART_BOUNDARY: &str = "annolab-test-boundary";

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
    pub files: TempDir,
}

/// A registered, verified and logged-in user
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
    pub default_workspace_id: String,
}

pub async fn spawn_app() -> TestApp {
    let db = annolab_common::db::init_memory_database().await.unwrap();
    let files = tempfile::tempdir().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let store = LocalStore::new(files.path(), "http://files.test");
    let tokens = TokenIssuer::new(
        &SecretString::from("integration-test-secret".to_string()),
        chrono::Duration::hours(1),
    )
    .unwrap();
    let settings = Settings {
        client_domain: "http://client.test".to_string(),
        local_files_root: Some(files.path().to_path_buf()),
        ..Settings::default()
    };

    let state = AppState::new(db.clone(), tokens, mailer.clone(), Arc::new(store), settings);
    TestApp {
        router: build_router(state),
        db,
        mailer,
        files,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), body).await
    }

    pub async fn register(&self, email: &str, username: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": email, "username": username, "password": PASSWORD })),
        )
        .await
    }

    /// Latest verification token issued for `email`
    pub async fn verification_token(&self, email: &str) -> String {
        sqlx::query_scalar(
            "SELECT e.token FROM email_verifications e JOIN users u ON u.id = e.user_id
             WHERE u.email = ? ORDER BY e.id DESC LIMIT 1",
        )
        .bind(email)
        .fetch_one(&self.db)
        .await
        .unwrap()
    }

    pub async fn login(&self, email: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await
    }

    /// Register, verify and log in
    pub async fn signup(&self, email: &str, username: &str) -> TestUser {
        let (status, body) = self.register(email, username).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let default_workspace_id = body["data"]["defaultWorkspaceId"]
            .as_str()
            .unwrap()
            .to_string();

        let token = self.verification_token(email).await;
        let (status, _) = self
            .call(
                Method::GET,
                &format!("/auth/verify-email?token={}", token),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self.login(email).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        TestUser {
            id,
            email: email.to_string(),
            token: body["data"]["access_token"].as_str().unwrap().to_string(),
            default_workspace_id,
        }
    }

    /// Id of the project created at registration
    pub async fn default_project_id(&self, user: &TestUser) -> String {
        sqlx::query_scalar("SELECT id FROM projects WHERE workspace_id = ? LIMIT 1")
            .bind(&user.default_workspace_id)
            .fetch_one(&self.db)
            .await
            .unwrap()
    }

    /// Add `user` to `workspace_id` with `role` directly in the database
    pub async fn add_member(&self, workspace_id: &str, user: &TestUser, role: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO workspace_members (user_id, workspace_id, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&user.id)
        .bind(workspace_id)
        .bind(role)
        .bind(chrono::Utc::now())
        .bind(chrono::Utc::now())
        .fetch_one(&self.db)
        .await
        .unwrap()
    }

    /// Create a dataset and upload `files` (name, bytes) into it
    pub async fn dataset_with_items(
        &self,
        user: &TestUser,
        project_id: &str,
        files: &[(&str, &[u8])],
    ) -> (String, Vec<String>) {
        let base = format!(
            "/workspaces/{}/projects/{}/datasets",
            user.default_workspace_id, project_id
        );
        let (status, body) = self.post(&base, &user.token, json!({ "name": "batch" })).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let dataset_id = body["data"]["id"].as_str().unwrap().to_string();

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/{}/items", base, dataset_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", user.token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(multipart_body(files)))
            .unwrap();
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        let ids = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_str().unwrap().to_string())
            .collect();
        (dataset_id, ids)
    }
}

/// `multipart/form-data` body with one `files` part per entry
pub fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                MULTIPART_BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
