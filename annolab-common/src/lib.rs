//! Shared types for the annolab services
//!
//! Holds the error type, bootstrap configuration, database initialization
//! and the entity models every service crate works with.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
