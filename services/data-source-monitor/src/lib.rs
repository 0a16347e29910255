//! Data-source monitor: keeps the training data manifest in step with the
//! data bucket by consuming its object-created notifications.

use anyhow::Result;
use mlops_core::{clear_ready, init_metrics, init_tracing, load_config, mark_ready, start_health_server};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

pub mod manifest;
pub mod notification;
pub mod server;
pub mod sink;

pub use manifest::{DataFile, Manifest, MANIFEST_ENTRY, MANIFEST_KEY};
pub use notification::{parse_delivery, Delivery, NotificationError, S3Event};
pub use server::{app, MonitorState};
pub use sink::{HttpConfirmer, ManifestSink, MemoryManifestSink, S3ManifestSink, SinkError, SubscriptionConfirmer};

pub const SERVICE_NAME: &str = "data-source-monitor";

pub async fn run() -> Result<()> {
    let cfg = load_config(SERVICE_NAME)?;
    init_tracing(&cfg)?;
    init_metrics();
    info!(bucket = %cfg.data_manifest_bucket_name, region = %cfg.aws_region, "config_loaded");
    start_health_server(cfg.health_port).await?;

    let sdk = mlops_core::aws::load_sdk_config(&cfg.aws_region).await;
    let state = MonitorState {
        sink: Arc::new(S3ManifestSink::from_sdk_config(&sdk, &cfg.data_manifest_bucket_name)),
        confirmer: Arc::new(HttpConfirmer::new(reqwest::Client::new())),
    };
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
