//! Versioned schema migrations
//!
//! The base tables come from [`crate::db::init`]. Anything added afterwards
//! goes here as a new `migrate_vN` function; existing migrations are never
//! edited. Each migration must be idempotent.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Increment when adding a migration
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Latest applied version, 0 for a fresh database
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: indexes on foreign key columns
///
/// SQLite does not index referencing columns on its own, and every cascade
/// or membership check scans them.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    const INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_email_verifications_user ON email_verifications(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_workspaces_owner ON workspaces(owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_members_workspace ON workspace_members(workspace_id)",
        "CREATE INDEX IF NOT EXISTS idx_invitations_workspace ON invitations(workspace_id)",
        "CREATE INDEX IF NOT EXISTS idx_invitations_email ON invitations(email)",
        "CREATE INDEX IF NOT EXISTS idx_projects_workspace ON projects(workspace_id)",
        "CREATE INDEX IF NOT EXISTS idx_datasets_project ON datasets(project_id)",
        "CREATE INDEX IF NOT EXISTS idx_data_items_dataset ON data_items(dataset_id)",
        "CREATE INDEX IF NOT EXISTS idx_class_labels_project ON class_labels(project_id)",
        "CREATE INDEX IF NOT EXISTS idx_annotations_item ON annotations(data_item_id)",
        "CREATE INDEX IF NOT EXISTS idx_annotations_class_label ON annotations(class_label_id)",
    ];

    info!("Running migration v1: foreign key indexes");
    for statement in INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Migration v2: ordering indexes for item navigation and dashboard progress
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: data item ordering indexes");

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_data_items_created ON data_items(dataset_id, created_at, id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_data_items_updated ON data_items(updated_at, status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
