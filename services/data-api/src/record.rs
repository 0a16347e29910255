//! Abalone feature and prediction records.
//!
//! Field order of [`FeatureRecord`] is significant: it defines the CSV row the
//! model endpoint was trained on.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Upper bound for any measurement; keeps values inside the store's number range.
pub const MAX_MEASUREMENT: f64 = 1e9;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("{field} must be a number between 0 and {max} (got {value})", max = MAX_MEASUREMENT)]
    InvalidMeasurement { field: &'static str, value: f64 },
    #[error("actual label must not be empty")]
    EmptyLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex { M, F, I }

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self { Sex::M => "M", Sex::F => "F", Sex::I => "I" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s { "M" => Some(Sex::M), "F" => Some(Sex::F), "I" => Some(Sex::I), _ => None }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    pub sex: Sex,
    pub length: f64,
    pub diameter: f64,
    pub height: f64,
    pub whole_weight: f64,
    pub shucked_weight: f64,
    pub viscera_weight: f64,
    pub shell_weight: f64,
}

impl FeatureRecord {
    /// Measurements in wire order, paired with their JSON names.
    pub fn measurements(&self) -> [(&'static str, f64); 7] {
        [
            ("length", self.length),
            ("diameter", self.diameter),
            ("height", self.height),
            ("wholeWeight", self.whole_weight),
            ("shuckedWeight", self.shucked_weight),
            ("visceraWeight", self.viscera_weight),
            ("shellWeight", self.shell_weight),
        ]
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        for (field, value) in self.measurements() {
            if !(0.0..=MAX_MEASUREMENT).contains(&value) {
                return Err(RecordError::InvalidMeasurement { field, value });
            }
        }
        Ok(())
    }

    /// Single CSV row: sex followed by the seven measurements, no header.
    pub fn to_csv(&self) -> String {
        let mut row = String::from(self.sex.as_str());
        for (_, value) in self.measurements() {
            row.push(',');
            row.push_str(&value.to_string());
        }
        row
    }
}

/// A feature record as persisted after inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(flatten)]
    pub features: FeatureRecord,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predict: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl PredictionRecord {
    pub fn new(id: impl Into<String>, features: FeatureRecord, predict: impl Into<String>) -> Self {
        Self { features, id: id.into(), predict: Some(predict.into()), actual: None }
    }
}

/// Feedback payload: `{"actual": <label>}`, label given as a string or a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActualLabel {
    #[serde(deserialize_with = "label_text")]
    pub actual: String,
}

impl ActualLabel {
    pub fn new(actual: impl Into<String>) -> Self { Self { actual: actual.into() } }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.actual.trim().is_empty() { return Err(RecordError::EmptyLabel); }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelValue { Text(String), Number(serde_json::Number) }

fn label_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match LabelValue::deserialize(d)? {
        LabelValue::Text(s) => s,
        LabelValue::Number(n) => n.to_string(),
    })
}
