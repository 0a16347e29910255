//! Inference and feedback handlers.
//!
//! Upstream failures are logged, counted and turned into soft results here;
//! nothing from the managed services propagates past this module.

use mlops_core::record_upstream_failure;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::predictor::Predictor;
use crate::record::{ActualLabel, FeatureRecord, PredictionRecord};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    Updated(PredictionRecord),
    UnknownId,
    Failed,
}

#[derive(Clone)]
pub struct DataService {
    predictor: Arc<dyn Predictor>,
    store: Arc<dyn RecordStore>,
}

impl DataService {
    pub fn new(predictor: Arc<dyn Predictor>, store: Arc<dyn RecordStore>) -> Self {
        Self { predictor, store }
    }

    /// Predict for `features` and persist the result under `id`.
    ///
    /// Returns `None` when either the prediction or the write fails. The store
    /// is only written after a successful prediction.
    #[instrument(skip(self, features))]
    pub async fn infer(&self, id: &str, features: FeatureRecord) -> Option<PredictionRecord> {
        let input = features.to_csv();
        info!(%input, "inference_input");
        let predict = match self.predictor.predict(&input).await {
            Ok(p) => p,
            Err(e) => {
                record_upstream_failure("sagemaker");
                error!(error = %e, "prediction_failed");
                return None;
            }
        };
        info!(%predict, "prediction_received");
        let record = PredictionRecord::new(id, features, predict);
        if let Err(e) = self.store.put(&record).await {
            record_upstream_failure("dynamodb");
            error!(error = %e, "record_write_failed");
            return None;
        }
        Some(record)
    }

    /// Attach the true label to a previously issued prediction.
    #[instrument(skip(self, label))]
    pub async fn add_label(&self, id: &str, label: &ActualLabel) -> FeedbackOutcome {
        match self.store.set_actual(id, &label.actual).await {
            Ok(record) => {
                info!(actual = %label.actual, "label_applied");
                FeedbackOutcome::Updated(record)
            }
            Err(StoreError::NotFound(_)) => {
                warn!("label_for_unknown_id");
                FeedbackOutcome::UnknownId
            }
            Err(e) => {
                record_upstream_failure("dynamodb");
                error!(error = %e, "label_update_failed");
                FeedbackOutcome::Failed
            }
        }
    }
}
