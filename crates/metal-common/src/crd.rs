//! Infrastructure CRD
//!
//! The cluster-scoped resource recording provider-specific infrastructure
//! state. Its `status.nodesCIDR` field is the handoff point between the
//! worker reconciler and the control-plane webhook: the converged aggregate
//! of all tenant-node private CIDRs as of the last successful reconcile.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Infrastructure records the provider-side state for one tenant cluster.
///
/// Example:
/// ```yaml
/// apiVersion: metal.gardener.cloud/v1alpha1
/// kind: Infrastructure
/// metadata:
///   name: shoot--core--prod
/// spec:
///   region: dc13
///   namespace: shoot--core--prod
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "metal.gardener.cloud",
    version = "v1alpha1",
    kind = "Infrastructure",
    status = "InfrastructureStatus",
    printcolumn = r#"{"name":"Region","type":"string","jsonPath":".spec.region"}"#,
    printcolumn = r#"{"name":"NodesCIDR","type":"string","jsonPath":".status.nodesCIDR"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    /// Equinix Metal region/metro the cluster's devices live in
    pub region: String,

    /// Control-plane namespace hosting the VPN routing workload and the
    /// cloud provider secret
    pub namespace: String,

    /// Name of the secret with provider credentials; defaults to
    /// `cloudprovider` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// Observed infrastructure state.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Comma-joined, sorted set of the tenant nodes' private management
    /// CIDRs, as of the last successful worker reconcile. Not real-time
    /// consistent with per-node annotations.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "nodesCIDR")]
    pub nodes_cidr: Option<String>,

    /// SSH key id provisioned for the cluster's devices
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "sshKeyID")]
    pub ssh_key_id: Option<String>,
}
