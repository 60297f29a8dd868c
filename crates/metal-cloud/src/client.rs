//! Device API client and the `DeviceReader` capability trait.

use async_trait::async_trait;
use tracing::debug;

use metal_common::{Error, Result};

use crate::credentials::Credentials;
use crate::types::Device;

const DEFAULT_BASE_URL: &str = "https://api.equinix.com/metal/v1";

/// Expansion directive so parent blocks arrive inline with the addresses.
const DEVICE_INCLUDE: &str = "ip_addresses.parent_block,parent_block";

/// Read access to the cloud provider's device inventory.
///
/// The worker reconciler only ever reads devices; keeping the trait this
/// narrow lets tests substitute a mock for the whole cloud API.
#[async_trait]
pub trait DeviceReader: Send + Sync {
    /// Fetch a device with expanded parent-block fields
    async fn get_device(&self, device_id: &str) -> Result<Device>;
}

/// Authenticated Equinix Metal API client.
pub struct MetalClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MetalClient {
    /// Create a client for the given credentials
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!(
                "metal-extension/{}",
                option_env!("CARGO_PKG_VERSION").unwrap_or("dev")
            ))
            .build()
            .map_err(|e| Error::internal("cloud", format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: credentials.api_token.clone(),
        })
    }

    /// Override the API base URL (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl DeviceReader for MetalClient {
    async fn get_device(&self, device_id: &str) -> Result<Device> {
        let url = format!("{}/devices/{}", self.base_url, device_id);

        debug!(device_id = %device_id, "fetching device from cloud api");

        let response = self
            .http
            .get(&url)
            .query(&[("include", DEVICE_INCLUDE)])
            .header("X-Auth-Token", &self.token)
            .send()
            .await
            .map_err(|e| Error::cloud_api(device_id, format!("device get failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::cloud_api(
                device_id,
                format!("device get returned HTTP {status}"),
            ));
        }

        response
            .json::<Device>()
            .await
            .map_err(|e| Error::cloud_api(device_id, format!("malformed device response: {e}")))
    }
}
