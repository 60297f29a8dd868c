//! Common types for the Equinix Metal extension: errors, constants, CRD, and utilities

#![deny(missing_docs)]

pub mod config;
pub mod crd;
pub mod error;
pub mod retry;
pub mod telemetry;

pub use config::ExtensionConfig;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Node annotation caching the resolved private management network CIDR.
///
/// Written once per node on first successful resolution; never invalidated.
pub const PRIVATE_NETWORK_ANNOTATION: &str = "metal.equinix.com/network-4-private";

/// Environment variable consumed by the VPN routing container to install
/// static routes towards the tenant nodes' private networks.
pub const NODE_NETWORK_ENV_VAR: &str = "NODE_NETWORK";

/// Current providerID scheme for Equinix Metal nodes.
pub const PROVIDER_NAME: &str = "equinixmetal";

/// Deprecated providerID scheme still present on long-lived nodes.
pub const DEPRECATED_PROVIDER_NAME: &str = "packet";

/// Legacy VPN sidecar container co-located in the kube-apiserver deployment.
pub const VPN_SEED_CONTAINER: &str = "vpn-seed";

/// Dedicated VPN workload name; doubles as its container name.
pub const VPN_SEED_SERVER: &str = "vpn-seed-server";

/// Name of the kube-apiserver deployment hosting the legacy sidecar.
pub const KUBE_APISERVER_DEPLOYMENT: &str = "kube-apiserver";

/// Well-known secret holding the provider credentials.
pub const CLOUD_PROVIDER_SECRET: &str = "cloudprovider";

/// Key in the cloud provider secret that holds the Equinix Metal API token.
pub const API_TOKEN_KEY: &str = "apiToken";

/// Key in the cloud provider secret that holds the Equinix Metal project id.
pub const PROJECT_ID_KEY: &str = "projectID";

/// Field manager recorded on every patch issued by this extension.
pub const FIELD_MANAGER: &str = "metal-extension";
