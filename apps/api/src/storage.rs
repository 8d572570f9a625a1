use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::debug;

/// Object storage seam. Uploaded files live under paths scoped to the owning
/// user (`"{user_id}/{uuid}.{ext}"`); the pipeline only ever downloads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Bytes>;
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<()>;
}

/// S3/MinIO-backed store used in production.
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, path: &str) -> Result<Bytes> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| anyhow!("S3 download failed for '{path}': {e}"))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("S3 body read failed for '{path}': {e}"))?;

        let bytes = body.into_bytes();
        debug!("Downloaded s3://{}/{} ({} bytes)", self.bucket, path, bytes.len());
        Ok(bytes)
    }

    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("S3 upload failed for '{path}': {e}"))?;

        debug!("Uploaded s3://{}/{}", self.bucket, path);
        Ok(())
    }
}
