//! Layered service configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional file named
//! by `MLOPS_CONFIG_FILE`, the plain deployment variables (`AWS_REGION`,
//! `SAGEMAKER_ENDPOINT_NAME`, `DATA_TABLE_NAME`, `DATA_MANIFEST_BUCKET_NAME`)
//! injected by the platform, then `MLOPS__*` environment overrides.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

pub const CONFIG_FILE_VAR: &str = "MLOPS_CONFIG_FILE";
pub const ENV_PREFIX: &str = "MLOPS";

/// Deployment variables set by the infrastructure stack, mapped to config keys.
const DEPLOYMENT_VARS: [(&str, &str); 4] = [
    ("AWS_REGION", "aws_region"),
    ("SAGEMAKER_ENDPOINT_NAME", "sagemaker_endpoint_name"),
    ("DATA_TABLE_NAME", "data_table_name"),
    ("DATA_MANIFEST_BUCKET_NAME", "data_manifest_bucket_name"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend { Dynamodb, Memory }

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub log_level: String,
    pub json_log: bool,
    pub listen_port: u16,
    pub health_port: u16,
    // Empty strings are kept as-is; the provider rejects calls against them.
    pub aws_region: String,
    pub sagemaker_endpoint_name: String,
    pub data_table_name: String,
    pub data_manifest_bucket_name: String,
    pub store_backend: StoreBackend,
    pub throttle_burst: u64,
    pub throttle_rate_per_sec: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            log_level: "info".into(),
            json_log: false,
            listen_port: 8080,
            health_port: 9090,
            aws_region: String::new(),
            sagemaker_endpoint_name: String::new(),
            data_table_name: String::new(),
            data_manifest_bucket_name: String::new(),
            store_backend: StoreBackend::Dynamodb,
            throttle_burst: 500,
            throttle_rate_per_sec: 1000,
        }
    }
}

/// Load the configuration for `service` from the process environment.
pub fn load_config(service: &str) -> Result<ServiceConfig> {
    let file = std::env::var(CONFIG_FILE_VAR).ok().map(PathBuf::from);
    let env: HashMap<String, String> = std::env::vars().collect();
    build_config(service, file, &env)
}

pub fn build_config(service: &str, file: Option<PathBuf>, env: &HashMap<String, String>) -> Result<ServiceConfig> {
    let d = ServiceConfig::default();
    let mut builder = config::Config::builder()
        .set_default("service_name", service)?
        .set_default("log_level", d.log_level)?
        .set_default("json_log", d.json_log)?
        .set_default("listen_port", d.listen_port as i64)?
        .set_default("health_port", d.health_port as i64)?
        .set_default("aws_region", d.aws_region)?
        .set_default("sagemaker_endpoint_name", d.sagemaker_endpoint_name)?
        .set_default("data_table_name", d.data_table_name)?
        .set_default("data_manifest_bucket_name", d.data_manifest_bucket_name)?
        .set_default("store_backend", "dynamodb")?
        .set_default("throttle_burst", d.throttle_burst as i64)?
        .set_default("throttle_rate_per_sec", d.throttle_rate_per_sec as i64)?;

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(false));
    }
    let deployment: HashMap<String, String> = DEPLOYMENT_VARS
        .iter()
        .filter_map(|(var, key)| env.get(*var).map(|v| (key.to_string(), v.clone())))
        .collect();
    builder = builder
        .add_source(config::Environment::default().source(Some(deployment)))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );
    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let cfg = build_config("data-api", None, &HashMap::new()).unwrap();
        assert_eq!(cfg.service_name, "data-api");
        assert_eq!(cfg.listen_port, 8080);
        assert_eq!(cfg.store_backend, StoreBackend::Dynamodb);
        assert_eq!(cfg.sagemaker_endpoint_name, "");
        assert_eq!(cfg.throttle_burst, 500);
    }

    #[test]
    fn deployment_vars_are_picked_up() {
        let cfg = build_config("data-api", None, &env(&[
            ("AWS_REGION", "eu-west-1"),
            ("SAGEMAKER_ENDPOINT_NAME", "abalone-endpoint"),
            ("DATA_TABLE_NAME", "DataTable"),
        ])).unwrap();
        assert_eq!(cfg.aws_region, "eu-west-1");
        assert_eq!(cfg.sagemaker_endpoint_name, "abalone-endpoint");
        assert_eq!(cfg.data_table_name, "DataTable");
        assert_eq!(cfg.data_manifest_bucket_name, "");
    }

    #[test]
    fn prefixed_overrides_parse_types() {
        let cfg = build_config("data-api", None, &env(&[
            ("MLOPS__LISTEN_PORT", "3000"),
            ("MLOPS__JSON_LOG", "true"),
            ("MLOPS__STORE_BACKEND", "memory"),
        ])).unwrap();
        assert_eq!(cfg.listen_port, 3000);
        assert!(cfg.json_log);
        assert_eq!(cfg.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn prefixed_override_beats_deployment_var() {
        let cfg = build_config("data-api", None, &env(&[
            ("AWS_REGION", "us-east-1"),
            ("MLOPS__AWS_REGION", "eu-west-1"),
            ("DATA_TABLE_NAME", "DataTable"),
        ])).unwrap();
        assert_eq!(cfg.aws_region, "eu-west-1");
        assert_eq!(cfg.data_table_name, "DataTable");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let cfg = build_config("monitor", Some(PathBuf::from("/nonexistent/mlops.yaml")), &HashMap::new()).unwrap();
        assert_eq!(cfg.service_name, "monitor");
    }
}
