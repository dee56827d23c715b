//! Single data items: lookup, rename, workflow status, navigation, bulk delete

use annolab_common::models::{DataItem, DataItemStatus, Role};
use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::access::project_scope;
use crate::storage::ObjectStore;
use crate::validation::require_name;

/// Position of an item within its project, ordered by upload time
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemNavigation {
    /// Zero-based
    pub current_index: i64,
    pub total: i64,
    pub prev_item_id: Option<String>,
    pub next_item_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedItems {
    pub deleted_count: u64,
}

/// Item that must belong to `project_id` (through its dataset)
pub async fn require_item(db: &SqlitePool, project_id: &str, item_id: &str) -> ApiResult<DataItem> {
    sqlx::query_as::<_, DataItem>(
        "SELECT i.* FROM data_items i JOIN datasets d ON d.id = i.dataset_id
         WHERE i.id = ? AND d.project_id = ?",
    )
    .bind(item_id)
    .bind(project_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Data item not found".to_string()))
}

pub async fn get(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_id: &str,
) -> ApiResult<DataItem> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;
    require_item(db, project_id, item_id).await
}

pub async fn rename(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_id: &str,
    name: Option<&str>,
) -> ApiResult<DataItem> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    require_item(db, project_id, item_id).await?;
    let name = name.map(|n| require_name(n, "Item name")).transpose()?;

    let item = sqlx::query_as::<_, DataItem>(
        "UPDATE data_items SET name = COALESCE(?, name), updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(name)
    .bind(Utc::now())
    .bind(item_id)
    .fetch_one(db)
    .await?;
    Ok(item)
}

/// Move an item through the labeling workflow; viewers may not
pub async fn update_status(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_id: &str,
    status: DataItemStatus,
) -> ApiResult<DataItem> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::EDITORS)).await?;
    require_item(db, project_id, item_id).await?;

    let item = sqlx::query_as::<_, DataItem>(
        "UPDATE data_items SET status = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(item_id)
    .fetch_one(db)
    .await?;

    info!(item_id, status = status.as_str(), "Data item status changed");
    Ok(item)
}

pub async fn navigation(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_id: &str,
) -> ApiResult<ItemNavigation> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;
    require_item(db, project_id, item_id).await?;

    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT i.id FROM data_items i JOIN datasets d ON d.id = i.dataset_id
         WHERE d.project_id = ?
         ORDER BY i.created_at ASC, i.id ASC",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;

    navigation_for(&ids, item_id)
        .ok_or_else(|| ApiError::NotFound("Data item not found".to_string()))
}

fn navigation_for(ids: &[String], item_id: &str) -> Option<ItemNavigation> {
    let index = ids.iter().position(|id| id == item_id)?;
    Some(ItemNavigation {
        current_index: index as i64,
        total: ids.len() as i64,
        prev_item_id: index.checked_sub(1).map(|i| ids[i].clone()),
        next_item_id: ids.get(index + 1).cloned(),
    })
}

/// Delete several items of one project
///
/// All ids must exist and belong to the project, otherwise nothing is
/// deleted. Stored files are removed best-effort after the rows are gone.
pub async fn delete_many(
    db: &SqlitePool,
    store: &dyn ObjectStore,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    item_ids: &[String],
) -> ApiResult<DeletedItems> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    if item_ids.is_empty() {
        return Err(ApiError::BadRequest("itemIds must not be empty".to_string()));
    }

    let unique: BTreeSet<&String> = item_ids.iter().collect();

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT i.id, i.path, d.project_id FROM data_items i
         JOIN datasets d ON d.id = i.dataset_id WHERE i.id IN (",
    );
    let mut separated = query.separated(", ");
    for id in &unique {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
    let found: Vec<(String, String, String)> = query.build_query_as().fetch_all(db).await?;

    if found.is_empty() {
        return Err(ApiError::NotFound("No data items found".to_string()));
    }
    if found.len() != unique.len() || found.iter().any(|(_, _, p)| p != project_id) {
        return Err(ApiError::NotFound(
            "Some data items were not found in this project".to_string(),
        ));
    }

    let mut tx = db.begin().await?;
    let mut deleted = 0;
    for (id, _, _) in &found {
        deleted += sqlx::query("DELETE FROM data_items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;

    for (_, key, _) in &found {
        if let Err(e) = store.delete(key).await {
            warn!(key = %key, "Failed to delete stored file: {:#}", e);
        }
    }

    info!(project_id, deleted, "Data items deleted");
    Ok(DeletedItems {
        deleted_count: deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_navigation_middle() {
        let nav = navigation_for(&ids(&["a", "b", "c"]), "b").unwrap();
        assert_eq!(
            nav,
            ItemNavigation {
                current_index: 1,
                total: 3,
                prev_item_id: Some("a".to_string()),
                next_item_id: Some("c".to_string()),
            }
        );
    }

    #[test]
    fn test_navigation_edges() {
        let first = navigation_for(&ids(&["a", "b"]), "a").unwrap();
        assert_eq!(first.prev_item_id, None);
        assert_eq!(first.next_item_id.as_deref(), Some("b"));

        let last = navigation_for(&ids(&["a", "b"]), "b").unwrap();
        assert_eq!(last.next_item_id, None);

        assert!(navigation_for(&ids(&["a"]), "z").is_none());
    }
}
