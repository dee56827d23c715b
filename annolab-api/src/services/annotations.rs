//! Annotation listing and client synchronization
//!
//! The labeling client keeps the full shape list of an item locally and
//! submits it in one request. [`sync`] reconciles that list with the stored
//! rows inside a single transaction: known ids are updated, unknown ids are
//! inserted, and any failure leaves the item untouched.

use annolab_common::models::{Annotation, Bbox, LabelType, Mask, Polygon, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::services::access::project_scope;
use crate::services::data_items::require_item;
use crate::services::new_id;

/// One shape as submitted by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationInput {
    /// Client-chosen id; generated when absent
    pub id: Option<String>,
    pub client_id: String,
    #[serde(rename = "type")]
    pub label_type: LabelType,
    pub bbox: Option<Bbox>,
    pub mask: Option<Mask>,
    pub polygon: Option<Polygon>,
    pub z_index: Option<i64>,
    pub class_label_id: Option<String>,
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DataItemRef {
    pub id: String,
}

/// Annotation as returned to the labeling client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationView {
    pub id: String,
    pub client_id: String,
    pub label_type: LabelType,
    pub class_label_id: Option<String>,
    pub polygon: Option<Polygon>,
    pub mask: Option<Mask>,
    pub bbox: Option<Bbox>,
    pub data_item: Option<DataItemRef>,
    pub z_index: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Annotation> for AnnotationView {
    fn from(a: Annotation) -> Self {
        Self {
            id: a.id,
            client_id: a.client_id,
            label_type: a.label_type,
            class_label_id: a.class_label_id,
            polygon: a.polygon.map(|Json(p)| p),
            mask: a.mask.map(|Json(m)| m),
            bbox: a.bbox.map(|Json(b)| b),
            data_item: a.data_item_id.map(|id| DataItemRef { id }),
            z_index: a.z_index,
            is_deleted: a.is_deleted,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

async fn load_for_item(conn: &mut SqliteConnection, item_id: &str) -> ApiResult<Vec<Annotation>> {
    let annotations = sqlx::query_as::<_, Annotation>(
        "SELECT * FROM annotations WHERE data_item_id = ? ORDER BY z_index ASC, created_at ASC, id ASC",
    )
    .bind(item_id)
    .fetch_all(conn)
    .await?;
    Ok(annotations)
}

/// All annotations of an item, soft-deleted ones included
pub async fn list(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_id: &str,
) -> ApiResult<Vec<AnnotationView>> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;
    require_item(db, project_id, item_id).await?;

    let mut conn = db.acquire().await?;
    let annotations = load_for_item(&mut conn, item_id).await?;
    Ok(annotations.into_iter().map(AnnotationView::from).collect())
}

/// Reconcile the submitted shapes with the stored ones
///
/// Returns the item's annotations as stored after the commit.
pub async fn sync(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_id: &str,
    inputs: Vec<AnnotationInput>,
) -> ApiResult<Vec<AnnotationView>> {
    let scope = project_scope(db, user_id, workspace_id, project_id, Some(Role::EDITORS)).await?;
    require_item(db, project_id, item_id).await?;

    let mut tx = db.begin().await?;

    let existing: HashMap<String, Annotation> = load_for_item(&mut tx, item_id)
        .await?
        .into_iter()
        .map(|a| (a.id.clone(), a))
        .collect();
    let mut checked_labels: HashSet<String> = HashSet::new();
    let (mut updated, mut inserted) = (0usize, 0usize);

    for input in inputs {
        if let Some(label_id) = &input.class_label_id {
            if !checked_labels.contains(label_id) {
                ensure_label_in_project(&mut tx, project_id, label_id).await?;
                checked_labels.insert(label_id.clone());
            }
        }

        let now = Utc::now();
        match input.id.as_deref().and_then(|id| existing.get(id)) {
            Some(current) => {
                let is_deleted = input.is_deleted.unwrap_or(current.is_deleted);
                let deleted_at = match (current.is_deleted, is_deleted) {
                    (_, false) => None,
                    (true, true) => current.deleted_at,
                    (false, true) => Some(now),
                };
                sqlx::query(
                    "UPDATE annotations SET
                         label_type = ?, bbox = ?, mask = ?, polygon = ?, z_index = ?,
                         is_deleted = ?, deleted_at = ?, class_label_id = ?, updated_at = ?
                     WHERE id = ?",
                )
                .bind(input.label_type)
                .bind(input.bbox.map(Json))
                .bind(input.mask.map(Json))
                .bind(input.polygon.map(Json))
                .bind(input.z_index.unwrap_or(current.z_index))
                .bind(is_deleted)
                .bind(deleted_at)
                .bind(&input.class_label_id)
                .bind(now)
                .bind(&current.id)
                .execute(&mut *tx)
                .await?;
                updated += 1;
            }
            None => {
                let id = input.id.clone().unwrap_or_else(new_id);
                sqlx::query(
                    "INSERT INTO annotations (id, client_id, label_type, bbox, mask, polygon,
                                             data_item_id, z_index, class_label_id, created_by,
                                             is_deleted, deleted_at, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?)",
                )
                .bind(&id)
                .bind(&input.client_id)
                .bind(input.label_type)
                .bind(input.bbox.map(Json))
                .bind(input.mask.map(Json))
                .bind(input.polygon.map(Json))
                .bind(item_id)
                .bind(input.z_index.unwrap_or(0))
                .bind(&input.class_label_id)
                .bind(scope.member.id)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                inserted += 1;
            }
        }
    }

    tx.commit().await?;
    info!(item_id, updated, inserted, "Annotations synchronized");

    let mut conn = db.acquire().await?;
    let annotations = load_for_item(&mut conn, item_id).await?;
    Ok(annotations.into_iter().map(AnnotationView::from).collect())
}

async fn ensure_label_in_project(
    conn: &mut SqliteConnection,
    project_id: &str,
    class_label_id: &str,
) -> ApiResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM class_labels WHERE id = ? AND project_id = ?)",
    )
    .bind(class_label_id)
    .bind(project_id)
    .fetch_one(conn)
    .await?;

    if exists {
        Ok(())
    } else {
        debug!(class_label_id, project_id, "Rejecting annotation with foreign class label");
        Err(ApiError::BadRequest(format!(
            "Class label {} does not belong to this project",
            class_label_id
        )))
    }
}
