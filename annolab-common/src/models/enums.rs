//! Enumerated column values
//!
//! Every enum is stored as TEXT and serialized in SCREAMING_SNAKE_CASE so the
//! database and the JSON API agree on spelling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user inside a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Reviewer,
    Worker,
    Viewer,
}

impl Role {
    /// Roles allowed to change workspace structure (projects, datasets, labels)
    pub const MANAGERS: &'static [Role] = &[Role::Owner, Role::Manager];

    /// Roles allowed to change annotation data
    pub const EDITORS: &'static [Role] = &[Role::Owner, Role::Manager, Role::Reviewer, Role::Worker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Reviewer => "REVIEWER",
            Role::Worker => "WORKER",
            Role::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    #[default]
    Free,
    Advanced,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    #[default]
    Image,
    Video,
}

/// Workflow status of a data item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataItemStatus {
    #[default]
    New,
    InProgress,
    ToReview,
    Done,
    Skipped,
    Completed,
}

impl DataItemStatus {
    pub const ALL: [DataItemStatus; 6] = [
        DataItemStatus::New,
        DataItemStatus::InProgress,
        DataItemStatus::ToReview,
        DataItemStatus::Done,
        DataItemStatus::Skipped,
        DataItemStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataItemStatus::New => "NEW",
            DataItemStatus::InProgress => "IN_PROGRESS",
            DataItemStatus::ToReview => "TO_REVIEW",
            DataItemStatus::Done => "DONE",
            DataItemStatus::Skipped => "SKIPPED",
            DataItemStatus::Completed => "COMPLETED",
        }
    }
}

/// Geometry kind of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelType {
    Bbox,
    Polygon,
    Mask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassType {
    Semantic,
    #[default]
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileStatus {
    #[default]
    Active,
    Pause,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_json_spelling() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
        let role: Role = serde_json::from_str("\"VIEWER\"").unwrap();
        assert_eq!(role, Role::Viewer);
        assert!(serde_json::from_str::<Role>("\"viewer\"").is_err());
    }

    #[test]
    fn test_role_sets() {
        assert!(Role::MANAGERS.contains(&Role::Manager));
        assert!(!Role::MANAGERS.contains(&Role::Worker));
        assert!(Role::EDITORS.contains(&Role::Reviewer));
        assert!(!Role::EDITORS.contains(&Role::Viewer));
    }

    #[test]
    fn test_status_spelling_matches_as_str() {
        for status in DataItemStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_label_type_spelling() {
        assert_eq!(serde_json::to_string(&LabelType::Bbox).unwrap(), "\"BBOX\"");
        let t: LabelType = serde_json::from_str("\"POLYGON\"").unwrap();
        assert_eq!(t, LabelType::Polygon);
    }
}
