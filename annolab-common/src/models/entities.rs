//! Row types for every table
//!
//! Field names match column names; JSON output is camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::enums::{
    ClassType, ContentType, DataItemStatus, LabelType, Plan, ProfileStatus, Role,
};

/// `[x, y, width, height]`
pub type Bbox = [f64; 4];
/// `[x, y]`
pub type Point = [f64; 2];
pub type Polygon = Vec<Point>;
/// Flattened mask coordinates as drawn by the client
pub type Mask = Vec<f64>;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub birthdate: Option<NaiveDate>,
    pub is_email_verified: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub default_workspace_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub profile_img: Option<String>,
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailVerification {
    pub id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub plan: Plan,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: i64,
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: i64,
    pub invited_user_id: Option<String>,
    pub email: String,
    pub workspace_id: String,
    pub role: Role,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub workspace_id: String,
    /// Membership id of the creator; cleared when the member leaves
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DataItem {
    pub id: String,
    pub name: String,
    pub file_url: String,
    pub original_name: String,
    pub filename: String,
    /// Object store key
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub status: DataItemStatus,
    pub dataset_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClassLabel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub class_type: ClassType,
    pub color: String,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Chosen by the client so it can reference unsaved shapes
    pub id: String,
    pub client_id: String,
    pub label_type: LabelType,
    pub bbox: Option<Json<Bbox>>,
    pub mask: Option<Json<Mask>>,
    pub polygon: Option<Json<Polygon>>,
    pub data_item_id: Option<String>,
    pub z_index: i64,
    pub class_label_id: Option<String>,
    pub created_by: Option<i64>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
