//! VPN workload propagation.
//!
//! The routing workload has worn three shapes across Gardener generations:
//! the legacy `vpn-seed` sidecar inside the kube-apiserver deployment, a
//! dedicated `vpn-seed-server` deployment, and a StatefulSet-backed
//! `vpn-seed-server`. The shape is resolved once per call into an explicit
//! topology before anything is mutated.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use kube::ResourceExt;
use tracing::debug;

use metal_common::{
    Result, KUBE_APISERVER_DEPLOYMENT, NODE_NETWORK_ENV_VAR, VPN_SEED_CONTAINER, VPN_SEED_SERVER,
};

use crate::kube_access::WorkerKube;

/// Resolved shape of the VPN routing workload in a control-plane namespace.
#[derive(Debug)]
pub enum VpnTopology {
    /// StatefulSet-backed `vpn-seed-server`; its owning pathway manages the
    /// environment, this component stays out
    DedicatedStatefulSet,
    /// Dedicated `vpn-seed-server` deployment
    DedicatedDeployment(Box<Deployment>),
    /// Legacy `vpn-seed` sidecar in the kube-apiserver deployment
    SidecarInDeployment(Box<Deployment>),
    /// The workload has not been created yet
    NotDeployed,
}

/// Resolve the current topology with at most three lookups.
pub async fn detect_topology(kube: &dyn WorkerKube, namespace: &str) -> Result<VpnTopology> {
    if kube
        .get_stateful_set(namespace, VPN_SEED_SERVER)
        .await?
        .is_some()
    {
        return Ok(VpnTopology::DedicatedStatefulSet);
    }

    if let Some(deploy) = kube.get_deployment(namespace, VPN_SEED_SERVER).await? {
        return Ok(VpnTopology::DedicatedDeployment(Box::new(deploy)));
    }

    if let Some(deploy) = kube
        .get_deployment(namespace, KUBE_APISERVER_DEPLOYMENT)
        .await?
    {
        return Ok(VpnTopology::SidecarInDeployment(Box::new(deploy)));
    }

    Ok(VpnTopology::NotDeployed)
}

/// Propagate the joined aggregate into the routing container's environment.
///
/// No-op when the StatefulSet variant owns the workload, when nothing is
/// deployed yet, or when the value already matches (drift avoidance).
/// Returns whether a patch was issued.
pub async fn propagate_node_network(
    kube: &dyn WorkerKube,
    namespace: &str,
    joined: &str,
) -> Result<bool> {
    let (deploy, container_name) = match detect_topology(kube, namespace).await? {
        VpnTopology::DedicatedStatefulSet => {
            debug!(namespace = %namespace, "vpn-seed-server is a StatefulSet, leaving it to its own pathway");
            return Ok(false);
        }
        VpnTopology::DedicatedDeployment(deploy) => (deploy, VPN_SEED_SERVER),
        VpnTopology::SidecarInDeployment(deploy) => (deploy, VPN_SEED_CONTAINER),
        VpnTopology::NotDeployed => {
            debug!(namespace = %namespace, "vpn workload not created yet, nothing to patch");
            return Ok(false);
        }
    };

    let Some(container) = container_by_name(&deploy, container_name) else {
        debug!(
            namespace = %namespace,
            container = %container_name,
            "deployment has no routing container, nothing to patch"
        );
        return Ok(false);
    };

    if env_value(container, NODE_NETWORK_ENV_VAR) == Some(joined) {
        debug!(namespace = %namespace, "routing environment already converged");
        return Ok(false);
    }

    let name = deploy.name_any();
    kube.patch_deployment_env(
        namespace,
        &name,
        container_name,
        NODE_NETWORK_ENV_VAR,
        joined,
    )
    .await?;
    Ok(true)
}

/// Find a container by name in a deployment's pod template.
pub fn container_by_name<'a>(deploy: &'a Deployment, name: &str) -> Option<&'a Container> {
    deploy
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == name)
}

/// Read a container env var's value, treating a valueless entry as absent.
pub fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
    container
        .env
        .as_ref()?
        .iter()
        .find(|e| e.name == name)
        .and_then(|e| e.value.as_deref())
}
