//! SNS HTTP delivery envelopes carrying S3 object-created events.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid SNS envelope: {0}")]
    Envelope(String),
    #[error("invalid S3 event in SNS message: {0}")]
    Event(String),
    #[error("unsupported SNS message type {0:?}")]
    UnsupportedType(String),
    #[error("refusing to confirm subscription via {0}")]
    UntrustedSubscribeUrl(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "MessageId", default)]
    message_id: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "SubscribeURL", default)]
    subscribe_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3EventRecord {
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3Bucket { pub name: String }

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3Object { pub key: String }

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    SubscriptionConfirmation { subscribe_url: String },
    UnsubscribeConfirmation,
    Notification { message_id: Option<String>, event: S3Event },
}

impl Delivery {
    pub fn kind(&self) -> &'static str {
        match self {
            Delivery::SubscriptionConfirmation { .. } => "SubscriptionConfirmation",
            Delivery::UnsubscribeConfirmation => "UnsubscribeConfirmation",
            Delivery::Notification { .. } => "Notification",
        }
    }
}

pub fn parse_delivery(body: &[u8]) -> Result<Delivery, NotificationError> {
    let env: Envelope = serde_json::from_slice(body).map_err(|e| NotificationError::Envelope(e.to_string()))?;
    match env.kind.as_str() {
        "SubscriptionConfirmation" => {
            let url = env.subscribe_url.ok_or_else(|| NotificationError::Envelope("missing SubscribeURL".into()))?;
            if !is_trusted_subscribe_url(&url) {
                return Err(NotificationError::UntrustedSubscribeUrl(url));
            }
            Ok(Delivery::SubscriptionConfirmation { subscribe_url: url })
        }
        "UnsubscribeConfirmation" => Ok(Delivery::UnsubscribeConfirmation),
        "Notification" => {
            let message = env.message.ok_or_else(|| NotificationError::Envelope("missing Message".into()))?;
            let event: S3Event = serde_json::from_str(&message).map_err(|e| NotificationError::Event(e.to_string()))?;
            Ok(Delivery::Notification { message_id: env.message_id, event })
        }
        other => Err(NotificationError::UnsupportedType(other.to_string())),
    }
}

/// Only SNS's own HTTPS endpoints may be called back.
fn is_trusted_subscribe_url(url: &str) -> bool {
    let Ok(parsed) = reqwest::Url::parse(url) else { return false };
    let host = parsed.host_str().unwrap_or_default();
    parsed.scheme() == "https" && host.starts_with("sns.") && host.ends_with(".amazonaws.com")
}
