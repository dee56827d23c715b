//! Business rules and queries
//!
//! Handlers parse requests and shape responses; everything that touches the
//! database, including permission checks, lives here.

pub mod access;
pub mod annotations;
pub mod auth;
pub mod class_labels;
pub mod dashboard;
pub mod data_items;
pub mod datasets;
pub mod invitations;
pub mod members;
pub mod profiles;
pub mod projects;
pub mod users;
pub mod workspaces;

/// Fresh primary key for TEXT-keyed tables
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
