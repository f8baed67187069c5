//! S3-compatible object store backend (S3, R2, MinIO)

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};

use super::store::{ObjectInfo, ObjectStore};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

/// Region S3 treats as the default; it must not be sent as a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// [`ObjectStore`] backed by the AWS SDK
#[derive(Clone)]
pub struct S3Store {
    client: S3Client,
    region: Option<String>,
}

impl S3Store {
    /// Wrap an already configured client
    pub fn new(client: S3Client, region: Option<String>) -> Self {
        Self { client, region }
    }

    /// Build a client from the environment, overridden by `config.region`
    /// and `config.endpoint_url`
    pub async fn from_config(config: &SyncConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            // Custom endpoints (R2, MinIO) generally need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = S3Client::from_conf(builder.build());

        let region = config
            .region
            .clone()
            .or_else(|| sdk_config.region().map(|r| r.to_string()));

        Ok(Self::new(client, region))
    }

    async fn create_container(&self, container: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(container);

        if let Some(region) = self.region.as_deref().filter(|r| *r != DEFAULT_REGION) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!("Created bucket {}", container);
                Ok(())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you() {
                    tracing::debug!("Bucket {} already exists", container);
                    Ok(())
                } else {
                    Err(SyncError::Remote(
                        DisplayErrorContext(&service_error).to_string(),
                    ))
                }
            }
        }
    }
}

fn remote_error(e: impl std::error::Error) -> SyncError {
    SyncError::Remote(DisplayErrorContext(e).to_string())
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// Percent-encode a key for the `x-amz-copy-source` header, keeping `/`
fn encode_copy_source(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn ensure_container(&self, container: &str) -> Result<()> {
        match self.client.head_bucket().bucket(container).send().await {
            Ok(_) => {
                tracing::debug!("Bucket {} exists", container);
                Ok(())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    self.create_container(container).await
                } else {
                    Err(remote_error(service_error))
                }
            }
        }
    }

    async fn list_objects(&self, container: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(container)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(remote_error)?;

            for object in response.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                objects.push(ObjectInfo {
                    key: key.to_string(),
                    integrity_tag: object.e_tag().unwrap_or_default().to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object.last_modified().and_then(to_chrono),
                });
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        tracing::debug!("Listed {} objects in s3://{}", objects.len(), container);
        Ok(objects)
    }

    async fn object_exists(&self, container: &str, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(container)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(remote_error(service_error))
                }
            }
        }
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let response = match self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                return Err(if service_error.is_no_such_key() {
                    SyncError::NotFound(format!("s3://{}/{}", container, key))
                } else {
                    remote_error(service_error)
                });
            }
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(remote_error)?
            .into_bytes();

        Ok(data.to_vec())
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }

    async fn copy_object(&self, container: &str, src_key: &str, dst_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(container)
            .copy_source(format!("{}/{}", container, encode_copy_source(src_key)))
            .key(dst_key)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(())
    }
}
