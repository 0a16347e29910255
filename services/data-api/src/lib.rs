//! Data API: abalone age inference with feedback-label correction.
//!
//! `POST /data` predicts and stores a record, `POST /data/{id}` attaches the
//! true label to a stored record.

use anyhow::Result;
use mlops_core::{clear_ready, init_metrics, init_tracing, load_config, mark_ready, start_health_server, ServiceConfig, StoreBackend, Throttle};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

pub mod predictor;
pub mod record;
pub mod router;
pub mod service;
pub mod store;

pub use predictor::{Predictor, SageMakerPredictor};
pub use record::{ActualLabel, FeatureRecord, PredictionRecord, Sex};
pub use router::{app, route, ApiReply, AppState, RouteError};
pub use service::{DataService, FeedbackOutcome};
pub use store::{DynamoRecordStore, MemoryRecordStore, RecordStore, StoreError};

pub const SERVICE_NAME: &str = "data-api";

/// Construct the managed-service clients once; they live for the process.
pub async fn build_state(cfg: &ServiceConfig) -> AppState {
    let sdk = mlops_core::aws::load_sdk_config(&cfg.aws_region).await;
    let predictor: Arc<dyn Predictor> = Arc::new(SageMakerPredictor::from_sdk_config(&sdk, &cfg.sagemaker_endpoint_name));
    let store: Arc<dyn RecordStore> = match cfg.store_backend {
        StoreBackend::Dynamodb => Arc::new(DynamoRecordStore::from_sdk_config(&sdk, &cfg.data_table_name)),
        StoreBackend::Memory => Arc::new(MemoryRecordStore::new()),
    };
    AppState {
        service: DataService::new(predictor, store),
        throttle: Arc::new(Throttle::new(cfg.throttle_burst, cfg.throttle_rate_per_sec)),
    }
}

pub async fn run() -> Result<()> {
    let cfg = load_config(SERVICE_NAME)?;
    init_tracing(&cfg)?;
    init_metrics();
    info!(
        endpoint = %cfg.sagemaker_endpoint_name,
        table = %cfg.data_table_name,
        region = %cfg.aws_region,
        store = ?cfg.store_backend,
        "config_loaded"
    );
    start_health_server(cfg.health_port).await?;

    let state = build_state(&cfg).await;
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    mark_ready();
    info!(?addr, "service_ready");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async { let _ = tokio::signal::ctrl_c().await; })
        .await?;
    clear_ready();
    info!("shutdown");
    Ok(())
}
