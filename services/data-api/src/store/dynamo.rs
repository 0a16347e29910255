//! DynamoDB-backed record store.
//!
//! Item layout: `id`, `sex`, `predict`, `actual` as `S`; measurements as `N`
//! under their camelCase names. Measurements written as `S` by older writers
//! are still readable.

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::DisplayErrorContext, types::{AttributeValue, ReturnValue}, Client};
use std::collections::HashMap;
use tracing::instrument;

use super::{RecordStore, StoreError};
use crate::record::{FeatureRecord, PredictionRecord, Sex};

const UPDATE_ACTUAL: &str = "SET actual = :a";
const REQUIRE_EXISTING: &str = "attribute_exists(id)";

pub struct DynamoRecordStore { client: Client, table_name: String }

impl DynamoRecordStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self { client, table_name: table_name.into() }
    }

    pub fn from_sdk_config(sdk: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self::new(Client::new(sdk), table_name)
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    #[instrument(skip(self, record), fields(table = %self.table_name, id = %record.id))]
    async fn put(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(record)))
            .send()
            .await
            .map_err(|e| StoreError::Upstream(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    #[instrument(skip(self, actual), fields(table = %self.table_name))]
    async fn set_actual(&self, id: &str, actual: &str) -> Result<PredictionRecord, StoreError> {
        let out = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression(UPDATE_ACTUAL)
            .condition_expression(REQUIRE_EXISTING)
            .expression_attribute_values(":a", AttributeValue::S(actual.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| {
                let missing = e.as_service_error().map(|se| se.is_conditional_check_failed_exception()).unwrap_or(false);
                if missing { StoreError::NotFound(id.to_string()) } else { StoreError::Upstream(DisplayErrorContext(&e).to_string()) }
            })?;
        let attrs = out.attributes().ok_or_else(|| StoreError::Codec("update returned no attributes".into()))?;
        from_item(attrs)
    }
}

pub fn to_item(record: &PredictionRecord) -> HashMap<String, AttributeValue> {
    let f = &record.features;
    let mut item = HashMap::with_capacity(11);
    item.insert("id".to_string(), AttributeValue::S(record.id.clone()));
    item.insert("sex".to_string(), AttributeValue::S(f.sex.as_str().to_string()));
    for (name, value) in f.measurements() {
        item.insert(name.to_string(), AttributeValue::N(value.to_string()));
    }
    if let Some(p) = &record.predict { item.insert("predict".to_string(), AttributeValue::S(p.clone())); }
    if let Some(a) = &record.actual { item.insert("actual".to_string(), AttributeValue::S(a.clone())); }
    item
}

pub fn from_item(item: &HashMap<String, AttributeValue>) -> Result<PredictionRecord, StoreError> {
    let sex_raw = text(item, "sex")?.ok_or_else(|| missing("sex"))?;
    let sex = Sex::parse(sex_raw).ok_or_else(|| StoreError::Codec(format!("unknown sex code {sex_raw:?}")))?;
    let features = FeatureRecord {
        sex,
        length: number(item, "length")?,
        diameter: number(item, "diameter")?,
        height: number(item, "height")?,
        whole_weight: number(item, "wholeWeight")?,
        shucked_weight: number(item, "shuckedWeight")?,
        viscera_weight: number(item, "visceraWeight")?,
        shell_weight: number(item, "shellWeight")?,
    };
    Ok(PredictionRecord {
        features,
        id: text(item, "id")?.ok_or_else(|| missing("id"))?.to_string(),
        predict: text(item, "predict")?.map(str::to_string),
        actual: text(item, "actual")?.map(str::to_string),
    })
}

fn missing(name: &str) -> StoreError { StoreError::Codec(format!("missing attribute {name}")) }

fn text<'a>(item: &'a HashMap<String, AttributeValue>, name: &str) -> Result<Option<&'a str>, StoreError> {
    match item.get(name) {
        None => Ok(None),
        Some(AttributeValue::S(s)) | Some(AttributeValue::N(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(StoreError::Codec(format!("attribute {name} has unexpected type {other:?}"))),
    }
}

fn number(item: &HashMap<String, AttributeValue>, name: &str) -> Result<f64, StoreError> {
    let raw = text(item, name)?.ok_or_else(|| missing(name))?;
    raw.parse::<f64>().map_err(|_| StoreError::Codec(format!("attribute {name} is not numeric: {raw:?}")))
}
