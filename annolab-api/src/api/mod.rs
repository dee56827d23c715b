//! HTTP API handlers
//!
//! Each module exposes the routes for one resource. Handlers extract and
//! shape; the rules live in [`crate::services`].

pub mod annotations;
pub mod auth;
pub mod class_labels;
pub mod dashboard;
pub mod data_items;
pub mod datasets;
pub mod health;
pub mod invitations;
pub mod members;
pub mod projects;
pub mod users;
pub mod workspaces;

use axum::http::{header, HeaderMap};

use crate::mail::templates::Language;

/// Mail language requested by the client through `Accept-Language`
pub(crate) fn request_language(headers: &HeaderMap) -> Language {
    Language::from_accept_language(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}
