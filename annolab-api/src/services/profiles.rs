//! User profiles (avatar and presence status)

use annolab_common::models::{Profile, ProfileStatus};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::ApiResult;
use crate::services::new_id;

/// Insert the initial profile for a new user
pub async fn create_default(conn: &mut SqliteConnection, user_id: &str) -> ApiResult<Profile> {
    let now = Utc::now();
    let profile = sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (id, user_id, profile_img, status, created_at, updated_at)
         VALUES (?, ?, NULL, ?, ?, ?)
         RETURNING *",
    )
    .bind(new_id())
    .bind(user_id)
    .bind(ProfileStatus::Active)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(profile)
}

/// Create the caller's profile or update the fields that were supplied
pub async fn upsert(
    db: &SqlitePool,
    user_id: &str,
    profile_img: Option<String>,
    status: Option<ProfileStatus>,
) -> ApiResult<Profile> {
    let now = Utc::now();
    let profile = sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (id, user_id, profile_img, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (user_id) DO UPDATE SET
             profile_img = COALESCE(excluded.profile_img, profiles.profile_img),
             status = CASE WHEN ? THEN excluded.status ELSE profiles.status END,
             updated_at = excluded.updated_at
         RETURNING *",
    )
    .bind(new_id())
    .bind(user_id)
    .bind(profile_img)
    .bind(status.unwrap_or_default())
    .bind(now)
    .bind(now)
    .bind(status.is_some())
    .fetch_one(db)
    .await?;
    Ok(profile)
}
