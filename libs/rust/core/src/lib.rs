//! Core shared utilities for the MLOps data services.

use anyhow::Result;
use axum::{http::{header, StatusCode}, response::IntoResponse, routing::get, Json, Router};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

pub mod aws;
pub mod config;
pub mod metrics;
pub mod throttle;

pub use config::{load_config, ServiceConfig, StoreBackend};
pub use metrics::{init_metrics, record_upstream_failure, API_METRICS, MONITOR_METRICS};
pub use throttle::Throttle;

static TRACING_INIT: OnceCell<()> = OnceCell::new();
static SERVICE_NAME: OnceCell<String> = OnceCell::new();
static NODE_READINESS: AtomicBool = AtomicBool::new(false);

pub fn mark_ready() { NODE_READINESS.store(true, Ordering::SeqCst); }
pub fn clear_ready() { NODE_READINESS.store(false, Ordering::SeqCst); }

/// Install the global subscriber. `RUST_LOG` wins over `cfg.log_level`.
pub fn init_tracing(cfg: &ServiceConfig) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
        let fmt_layer = if cfg.json_log {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .boxed()
        };
        tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;
        Ok(())
    })?;
    let _ = SERVICE_NAME.set(cfg.service_name.clone());
    info!(service = %cfg.service_name, json = cfg.json_log, "tracing_initialized");
    Ok(())
}

pub fn health_router() -> Router {
    Router::new()
        .route("/live", get(|| async { Json(serde_json::json!({"live": true})) }))
        .route("/ready", get(ready_handler))
        .route("/status", get(|| async {
            Json(serde_json::json!({
                "service": SERVICE_NAME.get(),
                "ready": NODE_READINESS.load(Ordering::SeqCst),
            }))
        }))
        .route("/metrics", get(metrics_handler))
}

pub async fn start_health_server(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(?addr, "health_server_listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_router()).await {
            tracing::error!(error = ?e, "health_server_failed");
        }
    });
    Ok(())
}

async fn ready_handler() -> impl IntoResponse {
    let ready = NODE_READINESS.load(Ordering::SeqCst);
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(serde_json::json!({"ready": ready})))
}

async fn metrics_handler() -> axum::response::Response {
    match metrics::render() {
        Ok(buf) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], buf).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn ready_flips_with_mark_ready() {
        clear_ready();
        let resp = health_router().oneshot(Request::get("/ready").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        mark_ready();
        let resp = health_router().oneshot(Request::get("/ready").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text_format() {
        init_metrics();
        API_METRICS.requests_total.with_label_values(&["feedback", "200"]).inc();
        let resp = health_router().oneshot(Request::get("/metrics").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("mlops_data_api_requests_total"));
    }
}
