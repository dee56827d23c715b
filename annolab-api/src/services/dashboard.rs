//! Project dashboard aggregates

use annolab_common::models::{DataItemStatus, Role};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::ApiResult;
use crate::services::access::project_scope;

/// Item counts per workflow status
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total: i64,
    pub new: i64,
    pub in_progress: i64,
    pub to_review: i64,
    pub done: i64,
    pub completed: i64,
    pub skipped: i64,
}

impl Overview {
    fn from_counts(counts: &[StatusCount]) -> Self {
        let mut overview = Overview::default();
        for c in counts {
            overview.total += c.count;
            let slot = match c.status {
                DataItemStatus::New => &mut overview.new,
                DataItemStatus::InProgress => &mut overview.in_progress,
                DataItemStatus::ToReview => &mut overview.to_review,
                DataItemStatus::Done => &mut overview.done,
                DataItemStatus::Completed => &mut overview.completed,
                DataItemStatus::Skipped => &mut overview.skipped,
            };
            *slot += c.count;
        }
        overview
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub workspace_name: String,
    pub datasets_count: i64,
    pub data_items_count: i64,
    pub members_count: i64,
    pub my_role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: DataItemStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DatasetTotal {
    pub dataset_id: String,
    pub dataset_name: String,
    pub total_items: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    /// `YYYY-MM-DD` of the last update
    pub date: String,
    pub status: DataItemStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatusCount {
    pub dataset_name: String,
    pub status: DataItemStatus,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub dataset_stats: Vec<DatasetTotal>,
    pub status_distribution: Vec<StatusCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsProgress {
    pub daily_progress: Vec<DailyCount>,
    pub dataset_status_distribution: Vec<DatasetStatusCount>,
}

#[derive(Debug, Serialize)]
pub struct Statistics {
    pub summary: StatisticsSummary,
    pub progress: StatisticsProgress,
}

/// Days covered by the daily progress chart
const PROGRESS_WINDOW_DAYS: i64 = 7;

async fn status_counts(db: &SqlitePool, project_id: &str) -> ApiResult<Vec<StatusCount>> {
    let counts = sqlx::query_as::<_, StatusCount>(
        "SELECT i.status AS status, COUNT(*) AS count
         FROM data_items i JOIN datasets d ON d.id = i.dataset_id
         WHERE d.project_id = ?
         GROUP BY i.status
         ORDER BY i.status",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(counts)
}

pub async fn overview(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<Overview> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;
    let counts = status_counts(db, project_id).await?;
    Ok(Overview::from_counts(&counts))
}

pub async fn info(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<ProjectInfo> {
    let scope = project_scope(db, user_id, workspace_id, project_id, None).await?;

    let (workspace_name, datasets_count, data_items_count, members_count): (
        String,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        "SELECT
             (SELECT name FROM workspaces WHERE id = ?1),
             (SELECT COUNT(*) FROM datasets WHERE project_id = ?2),
             (SELECT COUNT(*) FROM data_items i
                JOIN datasets d ON d.id = i.dataset_id
               WHERE d.project_id = ?2),
             (SELECT COUNT(*) FROM workspace_members WHERE workspace_id = ?1)",
    )
    .bind(workspace_id)
    .bind(project_id)
    .fetch_one(db)
    .await?;

    Ok(ProjectInfo {
        workspace_name,
        datasets_count,
        data_items_count,
        members_count,
        my_role: scope.member.role,
        created_at: scope.project.created_at,
    })
}

pub async fn statistics(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<Statistics> {
    project_scope(db, user_id, workspace_id, project_id, None).await?;

    let dataset_stats = sqlx::query_as::<_, DatasetTotal>(
        "SELECT d.id AS dataset_id, d.name AS dataset_name, COUNT(i.id) AS total_items
         FROM datasets d LEFT JOIN data_items i ON i.dataset_id = d.id
         WHERE d.project_id = ?
         GROUP BY d.id, d.name
         ORDER BY d.created_at ASC, d.id ASC",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;

    let status_distribution = status_counts(db, project_id).await?;

    let since = Utc::now() - Duration::days(PROGRESS_WINDOW_DAYS);
    let daily_progress = sqlx::query_as::<_, DailyCount>(
        "SELECT substr(i.updated_at, 1, 10) AS date, i.status AS status, COUNT(*) AS count
         FROM data_items i JOIN datasets d ON d.id = i.dataset_id
         WHERE d.project_id = ? AND i.updated_at >= ?
         GROUP BY date, i.status
         ORDER BY date DESC, i.status",
    )
    .bind(project_id)
    .bind(since)
    .fetch_all(db)
    .await?;

    let dataset_status_distribution = sqlx::query_as::<_, DatasetStatusCount>(
        "SELECT d.name AS dataset_name, i.status AS status, COUNT(*) AS count
         FROM data_items i JOIN datasets d ON d.id = i.dataset_id
         WHERE d.project_id = ?
         GROUP BY d.name, i.status
         ORDER BY d.name, i.status",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;

    Ok(Statistics {
        summary: StatisticsSummary {
            dataset_stats,
            status_distribution,
        },
        progress: StatisticsProgress {
            daily_progress,
            dataset_status_distribution,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_from_counts() {
        let counts = vec![
            StatusCount {
                status: DataItemStatus::New,
                count: 3,
            },
            StatusCount {
                status: DataItemStatus::Done,
                count: 2,
            },
            StatusCount {
                status: DataItemStatus::Skipped,
                count: 1,
            },
        ];
        let overview = Overview::from_counts(&counts);
        assert_eq!(overview.total, 6);
        assert_eq!(overview.new, 3);
        assert_eq!(overview.done, 2);
        assert_eq!(overview.skipped, 1);
        assert_eq!(overview.in_progress, 0);

        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["inProgress"], 0);
        assert_eq!(json["toReview"], 0);
    }
}
