//! Mutating admission webhook for control-plane workloads
//!
//! The API server recreates the kube-apiserver and VPN deployments for all
//! kinds of unrelated reasons (image bumps, resource changes). Between such
//! a recreation and the worker reconciler's next run, the routing
//! container's `NODE_NETWORK` variable would silently revert to unset; the
//! handlers here close that window by preserving the previously-stored
//! value and, for the dedicated VPN deployment, re-applying the recorded
//! Infrastructure aggregate.

pub mod controlplane;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::post, Router};
use kube::{Api, Client};

#[cfg(test)]
use mockall::automock;

use metal_common::crd::Infrastructure;
use metal_common::Result;

/// Read access to Infrastructure resources.
///
/// The webhook performs exactly one cross-resource read (the recorded
/// aggregate); everything else it sees arrives in the admission request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InfrastructureReader: Send + Sync {
    /// Find the Infrastructure whose control-plane namespace matches
    async fn infrastructure_for_namespace(&self, namespace: &str)
        -> Result<Option<Infrastructure>>;
}

/// Real implementation backed by a cluster-wide list.
pub struct InfrastructureApi {
    client: Client,
}

impl InfrastructureApi {
    /// Wrap a `kube::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InfrastructureReader for InfrastructureApi {
    async fn infrastructure_for_namespace(
        &self,
        namespace: &str,
    ) -> Result<Option<Infrastructure>> {
        let api: Api<Infrastructure> = Api::all(self.client.clone());
        let list = api.list(&Default::default()).await?;
        Ok(list
            .items
            .into_iter()
            .find(|infra| infra.spec.namespace == namespace))
    }
}

/// Shared state for webhook handlers
pub struct WebhookState {
    /// Infrastructure lookup used by the vpn-seed-server path
    pub infra: Arc<dyn InfrastructureReader>,
}

impl WebhookState {
    /// Create webhook state backed by the given Kubernetes client
    pub fn new(client: Client) -> Self {
        Self {
            infra: Arc::new(InfrastructureApi::new(client)),
        }
    }

    /// Create webhook state around an arbitrary reader (tests)
    pub fn with_reader(infra: Arc<dyn InfrastructureReader>) -> Self {
        Self { infra }
    }
}

/// Create the webhook router with all mutation endpoints
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(
            "/mutate/deployments",
            post(controlplane::mutate_deployment_handler),
        )
        .route(
            "/mutate/statefulsets",
            post(controlplane::mutate_stateful_set_handler),
        )
        .with_state(state)
}
