//! In-process record store for local runs and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{RecordStore, StoreError};
use crate::record::PredictionRecord;

#[derive(Default)]
pub struct MemoryRecordStore { items: RwLock<HashMap<String, PredictionRecord>> }

impl MemoryRecordStore {
    pub fn new() -> Self { Self::default() }
    pub fn get(&self, id: &str) -> Option<PredictionRecord> { self.items.read().get(id).cloned() }
    pub fn len(&self) -> usize { self.items.read().len() }
    pub fn is_empty(&self) -> bool { self.items.read().is_empty() }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.items.write().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn set_actual(&self, id: &str, actual: &str) -> Result<PredictionRecord, StoreError> {
        let mut items = self.items.write();
        let rec = items.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        rec.actual = Some(actual.to_string());
        Ok(rec.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample;

    #[tokio::test]
    async fn put_replaces_and_set_actual_updates() {
        let store = MemoryRecordStore::new();
        store.put(&PredictionRecord::new("a", sample(), "1")).await.unwrap();
        store.put(&PredictionRecord::new("a", sample(), "2")).await.unwrap();
        assert_eq!(store.len(), 1);
        let updated = store.set_actual("a", "3").await.unwrap();
        assert_eq!(updated.predict.as_deref(), Some("2"));
        assert_eq!(updated.actual.as_deref(), Some("3"));
        assert_eq!(store.get("a").unwrap(), updated);
    }

    #[tokio::test]
    async fn set_actual_on_unknown_id_is_not_found() {
        let store = MemoryRecordStore::new();
        assert!(matches!(store.set_actual("nope", "3").await, Err(StoreError::NotFound(id)) if id == "nope"));
        assert!(store.is_empty());
    }
}
