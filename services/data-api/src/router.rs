//! Request routing for the data API.
//!
//! [`route`] is the whole state machine: POST without an id runs inference,
//! POST with an id applies feedback, anything else is an error. It returns an
//! explicit [`Result`]; HTTP status codes and CORS headers are only attached
//! in [`app`], at the transport boundary.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use mlops_core::{Throttle, API_METRICS};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error};

use crate::record::{ActualLabel, FeatureRecord, PredictionRecord};
use crate::service::{DataService, FeedbackOutcome};

pub const CORS_HEADERS: [(HeaderName, &str); 4] = [
    (header::CONTENT_TYPE, "application/json"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS,POST,GET,PUT,DELETE"),
];

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("Unsupported HTTP method")]
    UnsupportedMethod(Method),
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    #[error("No record with id {0}")]
    UnknownId(String),
}

/// Successful handler outcomes. `Null` and `Empty` are the soft-failure shapes
/// of the inference and feedback paths.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Record(PredictionRecord),
    Null,
    Empty,
}

impl ApiReply {
    pub fn into_json(self) -> Value {
        match self {
            // PredictionRecord serialization cannot fail: plain strings and finite floats.
            ApiReply::Record(r) => serde_json::to_value(r).unwrap_or(Value::Null),
            ApiReply::Null => Value::Null,
            ApiReply::Empty => json!({}),
        }
    }
}

pub async fn route(service: &DataService, method: &Method, id: Option<&str>, body: &[u8]) -> Result<ApiReply, RouteError> {
    if *method != Method::POST {
        return Err(RouteError::UnsupportedMethod(method.clone()));
    }
    match id {
        None => {
            let features: FeatureRecord = parse_body(body)?;
            features.validate().map_err(|e| RouteError::MalformedBody(e.to_string()))?;
            let request_id = uuid::Uuid::new_v4().to_string();
            Ok(service.infer(&request_id, features).await.map(ApiReply::Record).unwrap_or(ApiReply::Null))
        }
        Some(id) => {
            let label: ActualLabel = parse_body(body)?;
            label.validate().map_err(|e| RouteError::MalformedBody(e.to_string()))?;
            match service.add_label(id, &label).await {
                FeedbackOutcome::Updated(r) => Ok(ApiReply::Record(r)),
                FeedbackOutcome::Failed => Ok(ApiReply::Empty),
                FeedbackOutcome::UnknownId => Err(RouteError::UnknownId(id.to_string())),
            }
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, RouteError> {
    serde_json::from_slice(body).map_err(|e| RouteError::MalformedBody(e.to_string()))
}

#[derive(Clone)]
pub struct AppState {
    pub service: DataService,
    pub throttle: Arc<Throttle>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/data", any(collection))
        .route("/data/:id", any(item))
        .fallback(not_found)
        .with_state(state)
}

async fn collection(State(st): State<AppState>, method: Method, body: Bytes) -> Response {
    dispatch(&st, method, None, body).await
}

async fn item(State(st): State<AppState>, Path(id): Path<String>, method: Method, body: Bytes) -> Response {
    dispatch(&st, method, Some(id), body).await
}

async fn not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({"message": "Not found"}))
}

async fn dispatch(st: &AppState, method: Method, id: Option<String>, body: Bytes) -> Response {
    let route_label = if id.is_some() { "feedback" } else { "inference" };
    if method == Method::OPTIONS {
        return (StatusCode::NO_CONTENT, CORS_HEADERS).into_response();
    }
    if !st.throttle.try_acquire() {
        API_METRICS.requests_total.with_label_values(&[route_label, "429"]).inc();
        return json_response(StatusCode::TOO_MANY_REQUESTS, json!({"message": "Too Many Requests"}));
    }
    let start = Instant::now();
    let (status, payload) = match route(&st.service, &method, id.as_deref(), &body).await {
        Ok(reply) => (StatusCode::OK, reply.into_json()),
        Err(e) => {
            error!(error = %e, %method, "request_failed");
            (status_for(&e), json!({"message": e.to_string()}))
        }
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    API_METRICS.request_latency_ms.with_label_values(&[route_label]).observe(elapsed_ms);
    API_METRICS.requests_total.with_label_values(&[route_label, status.as_str()]).inc();
    debug!(route = route_label, status = status.as_u16(), elapsed_ms, "request_completed");
    json_response(status, payload)
}

fn status_for(e: &RouteError) -> StatusCode {
    match e {
        RouteError::UnknownId(_) => StatusCode::NOT_FOUND,
        RouteError::UnsupportedMethod(_) | RouteError::MalformedBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response(status: StatusCode, payload: Value) -> Response {
    (status, CORS_HEADERS, payload.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::FakePredictor;
    use crate::store::MemoryRecordStore;

    const BODY: &[u8] = br#"{"sex":"M","length":0.5,"diameter":0.4,"height":0.1,"wholeWeight":0.5,"shuckedWeight":0.2,"visceraWeight":0.1,"shellWeight":0.15}"#;

    fn service() -> DataService {
        DataService::new(Arc::new(FakePredictor::ok("9")), Arc::new(MemoryRecordStore::new()))
    }

    #[tokio::test]
    async fn post_without_id_runs_inference() {
        let reply = route(&service(), &Method::POST, None, BODY).await.unwrap();
        let ApiReply::Record(rec) = reply else { panic!("expected record") };
        assert_eq!(rec.predict.as_deref(), Some("9"));
        assert!(uuid::Uuid::parse_str(&rec.id).is_ok());
    }

    #[tokio::test]
    async fn every_other_method_is_rejected() {
        for m in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let err = route(&service(), &m, None, BODY).await.unwrap_err();
            assert_eq!(err, RouteError::UnsupportedMethod(m.clone()));
            assert_eq!(err.to_string(), "Unsupported HTTP method");
            assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn feedback_body_is_read_as_label() {
        let svc = service();
        let ApiReply::Record(rec) = route(&svc, &Method::POST, None, BODY).await.unwrap() else { panic!() };
        let reply = route(&svc, &Method::POST, Some(&rec.id), br#"{"actual": 12}"#).await.unwrap();
        let ApiReply::Record(updated) = reply else { panic!("expected record") };
        assert_eq!(updated.actual.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn bad_bodies_are_malformed() {
        let svc = service();
        assert!(matches!(route(&svc, &Method::POST, None, b"not json").await, Err(RouteError::MalformedBody(_))));
        assert!(matches!(route(&svc, &Method::POST, Some("x"), br#"{"label": 1}"#).await, Err(RouteError::MalformedBody(_))));
        let negative = br#"{"sex":"M","length":-0.5,"diameter":0.4,"height":0.1,"wholeWeight":0.5,"shuckedWeight":0.2,"visceraWeight":0.1,"shellWeight":0.15}"#;
        assert!(matches!(route(&svc, &Method::POST, None, negative).await, Err(RouteError::MalformedBody(m)) if m.contains("length")));
    }

    #[test]
    fn soft_failures_render_as_null_and_empty_object() {
        assert_eq!(ApiReply::Null.into_json(), Value::Null);
        assert_eq!(ApiReply::Empty.into_json(), json!({}));
    }
}
