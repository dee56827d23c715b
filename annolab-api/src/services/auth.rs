//! Registration, login and email verification

use annolab_common::models::{EmailVerification, Role, User};
use chrono::{NaiveDate, Utc};
use rand::RngCore;
use secrecy::SecretString;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::IssuedToken;
use crate::error::{ApiError, ApiResult};
use crate::mail::templates::{verification_email, verification_link, Language};
use crate::services::{new_id, profiles, projects, users, workspaces};
use crate::validation::{validate_email, validate_password, validate_username};
use crate::AppState;

pub const DEFAULT_WORKSPACE_NAME: &str = "Default Workspace";
pub const DEFAULT_WORKSPACE_DESCRIPTION: &str = "This is a built-in workspace.";
pub const DEFAULT_PROJECT_NAME: &str = "Default Project";
pub const DEFAULT_PROJECT_DESCRIPTION: &str = "This is a default project description.";

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub birthdate: Option<NaiveDate>,
}

/// Create an account with its profile, default workspace and default project
///
/// Everything is created in one transaction. The verification email goes
/// out afterwards; a delivery failure is logged and the account stays.
pub async fn register(
    state: &AppState,
    registration: Registration,
    language: Language,
) -> ApiResult<User> {
    let email = registration.email.trim().to_ascii_lowercase();
    let username = registration.username.trim().to_string();
    validate_email(&email)?;
    validate_username(&username)?;
    validate_password(&registration.password)?;

    if users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = hash_password(SecretString::from(registration.password)).await?;
    let now = Utc::now();

    let mut tx = state.db.begin().await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, username, birthdate, is_email_verified, password_hash,
                            default_workspace_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, 0, ?, NULL, ?, ?)
         RETURNING *",
    )
    .bind(new_id())
    .bind(&email)
    .bind(&username)
    .bind(registration.birthdate)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    profiles::create_default(&mut tx, &user.id).await?;

    let workspace = workspaces::insert_workspace(
        &mut tx,
        &user.id,
        DEFAULT_WORKSPACE_NAME,
        Some(DEFAULT_WORKSPACE_DESCRIPTION),
    )
    .await?;
    let owner = workspaces::insert_member(&mut tx, &user.id, &workspace.id, Role::Owner).await?;
    projects::insert_project(
        &mut tx,
        &workspace.id,
        owner.id,
        DEFAULT_PROJECT_NAME,
        Some(DEFAULT_PROJECT_DESCRIPTION),
        Default::default(),
    )
    .await?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET default_workspace_id = ? WHERE id = ? RETURNING *",
    )
    .bind(&workspace.id)
    .bind(&user.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(user_id = %user.id, "User registered");

    if let Err(e) = send_verification(state, &user, language).await {
        warn!(user_id = %user.id, "Failed to send verification email: {}", e);
    }

    Ok(user)
}

/// Check credentials and mint an access token
///
/// Unverified accounts get a fresh verification email and are refused
/// with [`ApiError::EmailNotVerified`].
pub async fn login(
    state: &AppState,
    email: &str,
    password: String,
    language: Language,
) -> ApiResult<IssuedToken> {
    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(SecretString::from(password), user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_email_verified {
        send_verification(state, &user, language).await?;
        return Err(ApiError::EmailNotVerified(
            "Email is not verified. A verification email has been sent. \
             Please verify your email before logging in."
                .to_string(),
        ));
    }

    let token = state.tokens.mint(&user.id)?;
    info!(user_id = %user.id, "User logged in");
    Ok(token)
}

pub async fn resend_verification(state: &AppState, email: &str, language: Language) -> ApiResult<()> {
    let email = email.trim().to_ascii_lowercase();
    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    if user.is_email_verified {
        return Err(ApiError::Unauthorized(
            "Email is already verified".to_string(),
        ));
    }

    send_verification(state, &user, language).await
}

/// Store a new single-use token and mail the link
pub async fn send_verification(state: &AppState, user: &User, language: Language) -> ApiResult<()> {
    let token = generate_token();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO email_verifications (token, expires_at, is_used, user_id, created_at)
         VALUES (?, ?, 0, ?, ?)",
    )
    .bind(&token)
    .bind(now + state.settings.verification_ttl)
    .bind(&user.id)
    .bind(now)
    .execute(&state.db)
    .await?;

    let link = verification_link(&state.settings.client_domain, &token);
    state
        .mailer
        .send(verification_email(&user.email, &link, language))
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to send email: {}", e)))?;

    info!(user_id = %user.id, "Verification email sent");
    Ok(())
}

/// Consume a verification token and mark its user verified
pub async fn verify_email(db: &SqlitePool, token: &str) -> ApiResult<()> {
    let mut tx = db.begin().await?;

    let verification = sqlx::query_as::<_, EmailVerification>(
        "SELECT * FROM email_verifications WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Invalid verification token".to_string()))?;

    if verification.is_used {
        return Err(ApiError::BadRequest(
            "Verification token has already been used".to_string(),
        ));
    }
    if verification.expires_at < Utc::now() {
        return Err(ApiError::BadRequest(
            "Verification token has expired".to_string(),
        ));
    }

    sqlx::query("UPDATE email_verifications SET is_used = 1 WHERE id = ?")
        .bind(verification.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE users SET is_email_verified = 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(&verification.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(user_id = %verification.user_id, "Email verified");
    Ok(())
}

/// 32 random bytes, hex encoded
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
