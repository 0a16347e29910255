//! Shared AWS SDK configuration.

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Resolve credentials and endpoints from the default provider chain.
/// An empty `region` leaves region resolution to the chain as well.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if !region.is_empty() {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}
