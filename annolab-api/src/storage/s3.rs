//! Amazon S3 (or S3-compatible) object store

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use super::{ObjectStore, StoredObject};

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Base of the public object URLs
    url_base: String,
}

impl S3Store {
    /// Build a client from the default credential chain
    ///
    /// `region` falls back to the environment/profile and then `us-east-1`.
    /// With `endpoint` set, requests go to that S3-compatible server and URLs
    /// are path-style.
    pub async fn new(bucket: String, region: Option<String>, endpoint: Option<String>) -> Self {
        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Some(endpoint) = &endpoint {
            loader = loader.endpoint_url(endpoint.as_str());
        }
        let config = loader.load().await;

        let url_base = match &endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            None => format!("https://{}.s3.amazonaws.com", bucket),
        };
        let client = match endpoint {
            Some(_) => {
                let s3_config = aws_sdk_s3::config::Builder::from(&config)
                    .force_path_style(true)
                    .build();
                aws_sdk_s3::Client::from_conf(s3_config)
            }
            None => aws_sdk_s3::Client::new(&config),
        };

        info!(bucket = %bucket, "Using S3 object storage");
        Self {
            client,
            bucket,
            url_base,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<StoredObject> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to S3", key))?;

        debug!(key, "Stored object in S3");
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("{}/{}", self.url_base, key),
        })
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {} from S3", key))?;
        Ok(())
    }
}
