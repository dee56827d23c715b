//! Projects

use annolab_common::models::{ContentType, Project, Role, Workspace};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::pagination::Pagination;
use crate::services::access::{project_scope, require_member};
use crate::services::new_id;
use crate::validation::require_name;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Default)]
pub struct ProjectFilter {
    pub search: Option<String>,
    pub order: SortOrder,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Member who created a project
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreator {
    pub id: i64,
    pub role: Role,
    pub user_id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub workspace: Workspace,
    pub created_by_member: Option<ProjectCreator>,
}

pub async fn insert_project(
    conn: &mut SqliteConnection,
    workspace_id: &str,
    created_by: i64,
    name: &str,
    description: Option<&str>,
    content_type: ContentType,
) -> ApiResult<Project> {
    let now = Utc::now();
    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (id, name, description, content_type, workspace_id, created_by,
                               created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(new_id())
    .bind(name)
    .bind(description)
    .bind(content_type)
    .bind(workspace_id)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(project)
}

/// Any member may create a project in their workspace
pub async fn create(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    name: &str,
    description: Option<&str>,
    content_type: ContentType,
) -> ApiResult<Project> {
    let name = require_name(name, "Project name")?;
    let member = require_member(db, workspace_id, user_id).await?;

    let mut conn = db.acquire().await?;
    let project =
        insert_project(&mut conn, workspace_id, member.id, &name, description, content_type)
            .await?;

    info!(project_id = %project.id, workspace_id, "Project created");
    Ok(project)
}

pub async fn list(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    filter: &ProjectFilter,
    pagination: Pagination,
) -> ApiResult<ProjectList> {
    require_member(db, workspace_id, user_id).await?;

    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM projects WHERE workspace_id = ");
    count.push_bind(workspace_id);
    if let Some(pattern) = &pattern {
        count.push(" AND name LIKE ").push_bind(pattern.clone());
    }
    let total: i64 = count.build_query_scalar().fetch_one(db).await?;

    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM projects WHERE workspace_id = ");
    query.push_bind(workspace_id);
    if let Some(pattern) = &pattern {
        query.push(" AND name LIKE ").push_bind(pattern.clone());
    }
    query
        .push(" ORDER BY created_at ")
        .push(filter.order.sql())
        .push(", id ")
        .push(filter.order.sql())
        .push(" LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset);
    let projects = query.build_query_as::<Project>().fetch_all(db).await?;

    Ok(ProjectList {
        projects,
        total,
        page: pagination.page,
        limit: pagination.limit,
    })
}

/// A project with its workspace and creator, for members of that workspace
pub async fn get(db: &SqlitePool, user_id: &str, project_id: &str) -> ApiResult<ProjectDetail> {
    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    require_member(db, &project.workspace_id, user_id).await?;

    let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = ?")
        .bind(&project.workspace_id)
        .fetch_one(db)
        .await?;

    let created_by_member = match project.created_by {
        Some(member_id) => {
            sqlx::query_as::<_, ProjectCreator>(
                "SELECT m.id, m.role, m.user_id, u.username, u.email
                 FROM workspace_members m JOIN users u ON u.id = m.user_id
                 WHERE m.id = ?",
            )
            .bind(member_id)
            .fetch_optional(db)
            .await?
        }
        None => None,
    };

    Ok(ProjectDetail {
        project,
        workspace,
        created_by_member,
    })
}

pub async fn update(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> ApiResult<Project> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;
    let name = name.map(|n| require_name(n, "Project name")).transpose()?;

    let project = sqlx::query_as::<_, Project>(
        "UPDATE projects SET
             name = COALESCE(?, name),
             description = COALESCE(?, description),
             updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(name)
    .bind(description)
    .bind(Utc::now())
    .bind(project_id)
    .fetch_one(db)
    .await?;

    Ok(project)
}

/// Delete a project; datasets, items and labels go with it
pub async fn delete(
    db: &SqlitePool,
    user_id: &str,
    workspace_id: &str,
    project_id: &str,
) -> ApiResult<()> {
    project_scope(db, user_id, workspace_id, project_id, Some(Role::MANAGERS)).await?;

    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id)
        .execute(db)
        .await?;

    info!(project_id, workspace_id, "Project deleted");
    Ok(())
}
