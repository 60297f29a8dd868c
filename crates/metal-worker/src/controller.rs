//! Worker reconcile loop.
//!
//! One cycle discovers every node's private CIDR, aggregates, records the
//! result on the Infrastructure status and propagates it into the VPN
//! workload. Any cloud API or patch failure aborts the cycle before the
//! aggregate is written, so a partial aggregate never reaches the status.

use std::collections::BTreeSet;
use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{error, info};

use metal_cloud::{Credentials, DeviceReader, MetalClient};
use metal_common::crd::Infrastructure;
use metal_common::retry::RetryConfig;
use metal_common::{Error, ExtensionConfig, Result, CLOUD_PROVIDER_SECRET};

use crate::cidr::join_cidrs;
use crate::kube_access::WorkerKube;
use crate::node_cache::ensure_node_cidr;
use crate::status::record_nodes_cidr;
use crate::vpn::propagate_node_network;

/// Shared state for the worker controller.
pub struct Context {
    /// Kubernetes access
    pub kube: Arc<dyn WorkerKube>,
    /// Runtime configuration
    pub config: ExtensionConfig,
}

impl Context {
    /// Create a controller context
    pub fn new(kube: Arc<dyn WorkerKube>, config: ExtensionConfig) -> Self {
        Self { kube, config }
    }
}

/// What one convergence cycle did.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Canonical joined aggregate observed this cycle
    pub joined: String,
    /// Nodes listed this cycle
    pub node_count: usize,
    /// Whether the Infrastructure status was rewritten
    pub status_patched: bool,
    /// Whether the VPN workload environment was rewritten
    pub workload_patched: bool,
}

/// Reconcile one Infrastructure: discover, aggregate, record, propagate.
pub async fn reconcile(infra: Arc<Infrastructure>, ctx: Arc<Context>) -> Result<Action> {
    let name = infra.name_any();
    info!(infrastructure = %name, "reconciling private network aggregate");

    let secret_name = infra
        .spec
        .secret_name
        .as_deref()
        .unwrap_or(CLOUD_PROVIDER_SECRET);
    let secret = ctx
        .kube
        .get_secret(&infra.spec.namespace, secret_name)
        .await?;
    let credentials = Credentials::from_secret_data(&secret)?;

    let mut devices = MetalClient::new(&credentials)?;
    if let Some(base_url) = &ctx.config.metal_api_base_url {
        devices = devices.with_base_url(base_url.clone());
    }

    let outcome = reconcile_networks(
        ctx.kube.as_ref(),
        &devices,
        &ctx.config.conflict_retry,
        &infra,
    )
    .await?;

    info!(
        infrastructure = %name,
        nodes = outcome.node_count,
        nodes_cidr = %outcome.joined,
        status_patched = outcome.status_patched,
        workload_patched = outcome.workload_patched,
        "cycle converged"
    );

    Ok(Action::requeue(ctx.config.requeue_interval))
}

/// The cycle body, written against the capability traits so tests can run
/// it against mocks.
pub async fn reconcile_networks(
    kube: &dyn WorkerKube,
    devices: &dyn DeviceReader,
    retry: &RetryConfig,
    infra: &Infrastructure,
) -> Result<CycleOutcome> {
    let nodes = kube.list_nodes().await?;

    let mut cidrs = BTreeSet::new();
    for node in &nodes {
        if let Some(cidr) = ensure_node_cidr(kube, devices, retry, node).await? {
            cidrs.insert(cidr);
        }
    }

    let joined = join_cidrs(&cidrs);
    let status_patched = record_nodes_cidr(kube, retry, &infra.name_any(), &joined).await?;
    let workload_patched = propagate_node_network(kube, &infra.spec.namespace, &joined).await?;

    Ok(CycleOutcome {
        joined,
        node_count: nodes.len(),
        status_patched,
        workload_patched,
    })
}

/// Requeue with a short delay on failure; the work queue backs off further
/// on repeated errors.
pub fn error_policy(infra: Arc<Infrastructure>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        infrastructure = %infra.name_any(),
        error = %error,
        retryable = error.is_retryable(),
        "reconcile failed"
    );
    Action::requeue(ctx.config.error_requeue_interval)
}
