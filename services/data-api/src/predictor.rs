//! Remote prediction service adapter.

use async_trait::async_trait;
use aws_sdk_sagemakerruntime::{error::DisplayErrorContext, primitives::Blob, Client};
use thiserror::Error;
use tracing::instrument;

pub const REQUEST_CONTENT_TYPE: &str = "text/csv";
pub const RESPONSE_ACCEPT: &str = "application/json";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("prediction service call failed: {0}")]
    Call(String),
    #[error("prediction response is not valid UTF-8")]
    InvalidPayload,
}

#[async_trait]
pub trait Predictor: Send + Sync {
    /// Submit one CSV row and return the raw response body.
    async fn predict(&self, csv: &str) -> Result<String, UpstreamError>;
}

/// SageMaker runtime endpoint invoked synchronously.
pub struct SageMakerPredictor { client: Client, endpoint_name: String }

impl SageMakerPredictor {
    pub fn new(client: Client, endpoint_name: impl Into<String>) -> Self {
        Self { client, endpoint_name: endpoint_name.into() }
    }

    pub fn from_sdk_config(sdk: &aws_config::SdkConfig, endpoint_name: impl Into<String>) -> Self {
        Self::new(Client::new(sdk), endpoint_name)
    }

    pub fn endpoint_name(&self) -> &str { &self.endpoint_name }
}

#[async_trait]
impl Predictor for SageMakerPredictor {
    #[instrument(skip(self, csv), fields(endpoint = %self.endpoint_name))]
    async fn predict(&self, csv: &str) -> Result<String, UpstreamError> {
        let out = self
            .client
            .invoke_endpoint()
            .endpoint_name(&self.endpoint_name)
            .content_type(REQUEST_CONTENT_TYPE)
            .accept(RESPONSE_ACCEPT)
            .body(Blob::new(csv.as_bytes().to_vec()))
            .send()
            .await
            .map_err(|e| UpstreamError::Call(DisplayErrorContext(&e).to_string()))?;
        let bytes = out.body().map(|b| b.as_ref().to_vec()).unwrap_or_default();
        String::from_utf8(bytes).map_err(|_| UpstreamError::InvalidPayload)
    }
}
