//! User accounts

use annolab_common::models::{Profile, User};
use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::validation::{validate_password, validate_username};

/// A user with their profile, as returned by the profile endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
}

pub async fn find_by_id(db: &SqlitePool, user_id: &str) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_by_email(db: &SqlitePool, email: &str) -> ApiResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn get_with_profile(db: &SqlitePool, user_id: &str) -> ApiResult<UserWithProfile> {
    let user = find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(UserWithProfile { user, profile })
}

pub async fn change_password(
    db: &SqlitePool,
    user_id: &str,
    current_password: SecretString,
    new_password: String,
) -> ApiResult<()> {
    let user = find_by_id(db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(current_password, user.password_hash).await? {
        return Err(ApiError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }
    validate_password(&new_password)?;

    let password_hash = hash_password(SecretString::from(new_password)).await?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;

    info!(user_id, "Password changed");
    Ok(())
}

pub async fn update_username(db: &SqlitePool, user_id: &str, username: &str) -> ApiResult<User> {
    let username = username.trim();
    validate_username(username)?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET username = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(username)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(user)
}
