//! Upstream archive access.
//!
//! The production client lists NOAA's public GOES buckets anonymously with
//! the AWS SDK and streams objects over plain HTTPS with `reqwest`.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::config::ArchiveConfig;

/// Listing and retrieval against an object archive.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// All keys under `prefix`. An empty listing is not an error.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Stream one object into `dest`, returning the byte count.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64>;
}

/// Anonymous S3 access to the public GOES buckets.
pub struct S3Archive {
    s3_client: aws_sdk_s3::Client,
    http: Client,
    endpoint: Option<String>,
}

impl S3Archive {
    pub async fn new(config: &ArchiveConfig) -> Result<Self> {
        // NOAA buckets are public; sign nothing
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .no_credentials();
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&aws_config);
        if config.endpoint.is_some() {
            s3_config = s3_config.force_path_style(true);
        }
        let s3_client = aws_sdk_s3::Client::from_conf(s3_config.build());

        let http = Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            s3_client,
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
            None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
        }
    }
}

#[async_trait]
impl ArchiveClient for S3Archive {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .s3_client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .max_keys(1000);

            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token.clone());
            }

            let response = request.send().await.context("S3 list_objects_v2 failed")?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        debug!(bucket, prefix, count = keys.len(), "Listed archive prefix");
        Ok(keys)
    }

    #[instrument(skip(self, dest), fields(dest = %dest.display()))]
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        let url = self.object_url(bucket, key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("HTTP request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error {} for {}", response.status(), url));
        }

        let mut file = File::create(dest)
            .await
            .context("Failed to open output file")?;
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading response chunk")?;
            file.write_all(&chunk)
                .await
                .context("Error writing to file")?;
            bytes += chunk.len() as u64;
        }

        // Flush and sync
        file.flush().await?;
        file.sync_all().await?;

        Ok(bytes)
    }
}
