//! Object storage for uploaded media
//!
//! Data items record the object key and the public URL returned by the store.
//! Deleting an item deletes its object on a best-effort basis.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;

pub use local::LocalStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// Where an uploaded object ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> anyhow::Result<StoredObject>;

    /// Deleting a key that does not exist succeeds
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// `uploads/{project}/{dataset}/{YYYY-MM}/{millis}-{random}{.ext}`
///
/// The random suffix keeps two uploads in the same millisecond apart; the
/// original extension is kept so served files get a sensible content type.
pub fn upload_key(
    project_id: &str,
    dataset_id: &str,
    original_name: &str,
    now: DateTime<Utc>,
) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let extension = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    format!(
        "uploads/{}/{}/{}/{}-{}{}",
        project_id,
        dataset_id,
        now.format("%Y-%m"),
        now.timestamp_millis(),
        suffix,
        extension
    )
}
