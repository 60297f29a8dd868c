//! Extension configuration.
//!
//! One struct, constructed at startup from CLI flags and passed by reference
//! into each component's constructor. There are no package-level defaults.

use std::time::Duration;

use crate::retry::RetryConfig;

/// Runtime configuration shared by the controller and the webhook.
#[derive(Clone, Debug)]
pub struct ExtensionConfig {
    /// Requeue interval after a successful reconcile
    pub requeue_interval: Duration,
    /// Requeue interval after a failed reconcile
    pub error_requeue_interval: Duration,
    /// Retry policy for version-conflicted patches
    pub conflict_retry: RetryConfig,
    /// Override for the Equinix Metal API base URL (tests, proxies)
    pub metal_api_base_url: Option<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            requeue_interval: Duration::from_secs(300),
            error_requeue_interval: Duration::from_secs(30),
            conflict_retry: RetryConfig::default(),
            metal_api_base_url: None,
        }
    }
}
