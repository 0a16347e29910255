//! HTTP endpoint receiving SNS deliveries for the data bucket topic.

use axum::{body::Bytes, extract::State, http::StatusCode, response::{IntoResponse, Response}, routing::post, Json, Router};
use mlops_core::{record_upstream_failure, MONITOR_METRICS};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::manifest::{Manifest, MANIFEST_KEY};
use crate::notification::{parse_delivery, Delivery};
use crate::sink::{ManifestSink, SubscriptionConfirmer};

#[derive(Clone)]
pub struct MonitorState {
    pub sink: Arc<dyn ManifestSink>,
    pub confirmer: Arc<dyn SubscriptionConfirmer>,
}

pub fn app(state: MonitorState) -> Router {
    Router::new().route("/notifications", post(receive)).with_state(state)
}

fn reply(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

async fn receive(State(st): State<MonitorState>, body: Bytes) -> Response {
    let delivery = match parse_delivery(&body) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "delivery_rejected");
            return reply(StatusCode::BAD_REQUEST, e.to_string());
        }
    };
    MONITOR_METRICS.notifications_total.with_label_values(&[delivery.kind()]).inc();
    match delivery {
        Delivery::SubscriptionConfirmation { subscribe_url } => match st.confirmer.confirm(&subscribe_url).await {
            Ok(()) => {
                info!("subscription_confirmed");
                reply(StatusCode::OK, "subscription confirmed")
            }
            Err(e) => {
                record_upstream_failure(e.service);
                error!(error = %e, "subscription_confirm_failed");
                reply(StatusCode::BAD_GATEWAY, e.to_string())
            }
        },
        Delivery::UnsubscribeConfirmation => reply(StatusCode::OK, "ignored"),
        Delivery::Notification { message_id, event } => {
            if event.records.is_empty() {
                info!(?message_id, "no_data_records");
                return reply(StatusCode::OK, "no data records");
            }
            let manifest = Manifest::from_event(&event);
            info!(?message_id, files = manifest.data.len(), "updating_data_manifest");
            match write_manifest(st.sink.as_ref(), &manifest).await {
                Ok(()) => {
                    MONITOR_METRICS.manifests_written_total.inc();
                    reply(StatusCode::OK, "manifest updated")
                }
                Err(resp) => resp,
            }
        }
    }
}

async fn write_manifest(sink: &dyn ManifestSink, manifest: &Manifest) -> Result<(), Response> {
    let archive = manifest.to_archive().map_err(|e| {
        error!(error = %e, "manifest_build_failed");
        reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    sink.put_manifest(MANIFEST_KEY, archive).await.map_err(|e| {
        record_upstream_failure(e.service);
        error!(error = %e, "manifest_upload_failed");
        reply(StatusCode::BAD_GATEWAY, e.to_string())
    })
}
