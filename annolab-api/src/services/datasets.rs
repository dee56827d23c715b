//! Datasets and media upload

use annolab_common::models::{DataItem, DataItemStatus, Dataset, Role};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, Pagination};
use crate::services::access::project_scope;
use crate::services::new_id;
use crate::storage::{upload_key, ObjectStore, StoredObject};
use crate::validation::require_name;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    pub total_datasets: i64,
    pub total_items: i64,
}

/// One file taken from a multipart upload
#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Dataset that must belong to `project_id`
pub async fn require_dataset(
    db: &SqlitePool,
    project_id: &str,
    dataset_id: &str,
) -> ApiResult<Dataset> {
    sqlx::query_as::<_, Dataset>("SELECT * FROM datasets WHERE id = ? AND project_id = ?")
        .bind(dataset_id)
        .bind(project_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dataset not found".to_string()))
}

pub async fn list(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<Vec<Dataset>> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;

    let datasets = sqlx::query_as::<_, Dataset>(
        "SELECT * FROM datasets WHERE project_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(datasets)
}

pub async fn stats(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<DatasetStats> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;

    let (total_datasets, total_items): (i64, i64) = sqlx::query_as(
        "SELECT
             (SELECT COUNT(*) FROM datasets WHERE project_id = ?1),
             (SELECT COUNT(*) FROM data_items i
                JOIN datasets d ON d.id = i.dataset_id
               WHERE d.project_id = ?1)",
    )
    .bind(project_id)
    .fetch_one(db)
    .await?;

    Ok(DatasetStats {
        total_datasets,
        total_items,
    })
}

pub async fn create(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    name: &str,
) -> ApiResult<Dataset> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    let name = require_name(name, "Dataset name")?;

    let now = Utc::now();
    let dataset = sqlx::query_as::<_, Dataset>(
        "INSERT INTO datasets (id, name, project_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(new_id())
    .bind(&name)
    .bind(project_id)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await?;

    info!(dataset_id = %dataset.id, project_id, "Dataset created");
    Ok(dataset)
}

pub async fn update(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    dataset_id: &str,
    name: Option<&str>,
) -> ApiResult<Dataset> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    require_dataset(db, project_id, dataset_id).await?;
    let name = name.map(|n| require_name(n, "Dataset name")).transpose()?;

    let dataset = sqlx::query_as::<_, Dataset>(
        "UPDATE datasets SET name = COALESCE(?, name), updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(name)
    .bind(Utc::now())
    .bind(dataset_id)
    .fetch_one(db)
    .await?;
    Ok(dataset)
}

/// Delete a dataset with its items
///
/// Stored files are removed first; a file that cannot be removed is logged
/// and does not stop the delete.
pub async fn delete(
    db: &SqlitePool,
    store: &dyn ObjectStore,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    dataset_id: &str,
) -> ApiResult<()> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    require_dataset(db, project_id, dataset_id).await?;

    let keys: Vec<String> = sqlx::query_scalar("SELECT path FROM data_items WHERE dataset_id = ?")
        .bind(dataset_id)
        .fetch_all(db)
        .await?;
    for key in &keys {
        if let Err(e) = store.delete(key).await {
            warn!(key = %key, "Failed to delete stored file: {:#}", e);
        }
    }

    sqlx::query("DELETE FROM datasets WHERE id = ?")
        .bind(dataset_id)
        .execute(db)
        .await?;

    info!(dataset_id, files = keys.len(), "Dataset deleted");
    Ok(())
}

/// Data items of one dataset, or of the whole project when `dataset_id` is `None`
pub async fn list_items(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    dataset_id: Option<&str>,
    pagination: Pagination,
) -> ApiResult<Page<DataItem>> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;

    let (total, items) = match dataset_id {
        Some(dataset_id) => {
            require_dataset(db, project_id, dataset_id).await?;
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM data_items WHERE dataset_id = ?")
                    .bind(dataset_id)
                    .fetch_one(db)
                    .await?;
            let items = sqlx::query_as::<_, DataItem>(
                "SELECT * FROM data_items WHERE dataset_id = ?
                 ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            )
            .bind(dataset_id)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(db)
            .await?;
            (total, items)
        }
        None => {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM data_items i JOIN datasets d ON d.id = i.dataset_id
                 WHERE d.project_id = ?",
            )
            .bind(project_id)
            .fetch_one(db)
            .await?;
            let items = sqlx::query_as::<_, DataItem>(
                "SELECT i.* FROM data_items i JOIN datasets d ON d.id = i.dataset_id
                 WHERE d.project_id = ?
                 ORDER BY i.created_at ASC, i.id ASC LIMIT ? OFFSET ?",
            )
            .bind(project_id)
            .bind(pagination.limit)
            .bind(pagination.offset)
            .fetch_all(db)
            .await?;
            (total, items)
        }
    };

    Ok(Page::new(items, total, pagination))
}

/// Store uploaded files and record them as NEW data items
///
/// Files already stored are removed again if a later file or the row inserts fail.
pub async fn upload_items(
    db: &SqlitePool,
    store: &dyn ObjectStore,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    dataset_id: &str,
    files: Vec<UploadedFile>,
) -> ApiResult<Vec<DataItem>> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    require_dataset(db, project_id, dataset_id).await?;
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let now = Utc::now();
        let key = upload_key(project_id, dataset_id, &file.original_name, now);
        let size = file.bytes.len() as i64;
        match store.put(&key, file.bytes, &file.content_type).await {
            Ok(object) => stored.push(StoredUpload {
                original_name: file.original_name,
                content_type: file.content_type,
                size,
                object,
            }),
            Err(e) => {
                discard_uploads(store, &stored).await;
                return Err(ApiError::Internal(format!("Failed to store upload: {:#}", e)));
            }
        }
    }

    let items = match insert_items(db, dataset_id, &stored).await {
        Ok(items) => items,
        Err(e) => {
            discard_uploads(store, &stored).await;
            return Err(e);
        }
    };

    info!(dataset_id, count = items.len(), "Uploaded data items");
    Ok(items)
}

/// A file already written to the object store, waiting for its row
struct StoredUpload {
    original_name: String,
    content_type: String,
    size: i64,
    object: StoredObject,
}

async fn insert_items(
    db: &SqlitePool,
    dataset_id: &str,
    stored: &[StoredUpload],
) -> ApiResult<Vec<DataItem>> {
    let mut tx = db.begin().await?;
    let mut items = Vec::with_capacity(stored.len());
    for upload in stored {
        let key = &upload.object.key;
        let filename = key.rsplit('/').next().unwrap_or(key);
        let now = Utc::now();
        let item = sqlx::query_as::<_, DataItem>(
            "INSERT INTO data_items (id, name, file_url, original_name, filename, path, mime_type,
                                     size, status, dataset_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(new_id())
        .bind(&upload.original_name)
        .bind(&upload.object.url)
        .bind(&upload.original_name)
        .bind(filename)
        .bind(key)
        .bind(&upload.content_type)
        .bind(upload.size)
        .bind(DataItemStatus::New)
        .bind(dataset_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }
    tx.commit().await?;
    Ok(items)
}

/// Remove objects whose rows were never written
async fn discard_uploads(store: &dyn ObjectStore, stored: &[StoredUpload]) {
    for upload in stored {
        if let Err(e) = store.delete(&upload.object.key).await {
            warn!(key = %upload.object.key, "Failed to clean up stored file: {:#}", e);
        }
    }
}
