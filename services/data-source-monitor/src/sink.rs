//! Destinations for the manifest archive and the SNS subscription callback.

use async_trait::async_trait;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client};
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
#[error("{service} call failed: {message}")]
pub struct SinkError { pub service: &'static str, pub message: String }

#[async_trait]
pub trait ManifestSink: Send + Sync {
    async fn put_manifest(&self, key: &str, archive: Vec<u8>) -> Result<(), SinkError>;
}

#[async_trait]
pub trait SubscriptionConfirmer: Send + Sync {
    async fn confirm(&self, subscribe_url: &str) -> Result<(), SinkError>;
}

pub struct S3ManifestSink { client: Client, bucket: String }

impl S3ManifestSink {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self { Self { client, bucket: bucket.into() } }

    pub fn from_sdk_config(sdk: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        Self::new(Client::new(sdk), bucket)
    }
}

#[async_trait]
impl ManifestSink for S3ManifestSink {
    #[instrument(skip(self, archive), fields(bucket = %self.bucket, bytes = archive.len()))]
    async fn put_manifest(&self, key: &str, archive: Vec<u8>) -> Result<(), SinkError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/zip")
            .body(ByteStream::from(archive))
            .send()
            .await
            .map_err(|e| SinkError { service: "s3", message: DisplayErrorContext(&e).to_string() })?;
        Ok(())
    }
}

/// In-process sink used for local runs and tests.
#[derive(Default)]
pub struct MemoryManifestSink { objects: Mutex<HashMap<String, Vec<u8>>>, puts: Mutex<usize> }

impl MemoryManifestSink {
    pub fn new() -> Self { Self::default() }
    pub fn get(&self, key: &str) -> Option<Vec<u8>> { self.objects.lock().get(key).cloned() }
    pub fn put_count(&self) -> usize { *self.puts.lock() }
}

#[async_trait]
impl ManifestSink for MemoryManifestSink {
    async fn put_manifest(&self, key: &str, archive: Vec<u8>) -> Result<(), SinkError> {
        self.objects.lock().insert(key.to_string(), archive);
        *self.puts.lock() += 1;
        Ok(())
    }
}

pub struct HttpConfirmer { client: reqwest::Client }

impl HttpConfirmer {
    pub fn new(client: reqwest::Client) -> Self { Self { client } }
}

#[async_trait]
impl SubscriptionConfirmer for HttpConfirmer {
    async fn confirm(&self, subscribe_url: &str) -> Result<(), SinkError> {
        let err = |e: reqwest::Error| SinkError { service: "sns", message: e.to_string() };
        self.client.get(subscribe_url).send().await.map_err(err)?.error_for_status().map_err(err)?;
        Ok(())
    }
}
