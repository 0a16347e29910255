//! Keyed store for prediction records.
//!
//! The store is the only durable owner of a [`PredictionRecord`]; handlers hold
//! records for the span of one request.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::PredictionRecord;

mod dynamo;
mod memory;

pub use dynamo::{from_item, to_item, DynamoRecordStore};
pub use memory::MemoryRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record with id {0}")]
    NotFound(String),
    #[error("store call failed: {0}")]
    Upstream(String),
    #[error("stored item is malformed: {0}")]
    Codec(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write the full record, replacing any item with the same id.
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Set the `actual` attribute of an existing record and return the record
    /// as stored after the update.
    async fn set_actual(&self, id: &str, actual: &str) -> Result<PredictionRecord, StoreError>;
}
