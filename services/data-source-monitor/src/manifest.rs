//! Data manifest consumed by the training pipeline's source stage.

use serde::Serialize;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::{write::SimpleFileOptions, ZipWriter};

use crate::notification::S3Event;

/// Entry name inside the archive.
pub const MANIFEST_ENTRY: &str = "manifest.json";
/// Object key the archive is uploaded under.
pub const MANIFEST_KEY: &str = "manifest.json.zip";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest archive failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("manifest archive write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    pub bucket_name: String,
    pub object_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub data: Vec<DataFile>,
}

impl Manifest {
    /// One entry per record carrying an `s3` section, in event order.
    pub fn from_event(event: &S3Event) -> Self {
        let data = event
            .records
            .iter()
            .filter_map(|r| r.s3.as_ref())
            .map(|s3| DataFile { bucket_name: s3.bucket.name.clone(), object_key: s3.object.key.clone() })
            .collect();
        Self { data }
    }

    pub fn to_json(&self) -> Result<String, ManifestError> { Ok(serde_json::to_string(self)?) }

    /// Zip archive holding the manifest as its only entry.
    pub fn to_archive(&self) -> Result<Vec<u8>, ManifestError> {
        let json = self.to_json()?;
        let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
        zw.start_file(MANIFEST_ENTRY, SimpleFileOptions::default())?;
        zw.write_all(json.as_bytes())?;
        Ok(zw.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{S3Bucket, S3Entity, S3EventRecord, S3Object};
    use std::io::Read;

    fn rec(bucket: &str, key: &str) -> S3EventRecord {
        S3EventRecord { s3: Some(S3Entity { bucket: S3Bucket { name: bucket.into() }, object: S3Object { key: key.into() } }) }
    }

    #[test]
    fn lists_records_in_order_and_skips_non_s3() {
        let event = S3Event { records: vec![rec("b", "one.csv"), S3EventRecord { s3: None }, rec("b", "two.csv")] };
        let m = Manifest::from_event(&event);
        assert_eq!(m.to_json().unwrap(), r#"{"data":[{"bucketName":"b","objectKey":"one.csv"},{"bucketName":"b","objectKey":"two.csv"}]}"#);
    }

    #[test]
    fn archive_contains_single_manifest_entry() {
        let m = Manifest::from_event(&S3Event { records: vec![rec("data", "abalone.csv")] });
        let bytes = m.to_archive().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut text = String::new();
        archive.by_name(MANIFEST_ENTRY).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, m.to_json().unwrap());
    }
}
