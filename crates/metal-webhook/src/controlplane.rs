//! Admission handlers for the control-plane's VPN-bearing workloads.
//!
//! Mutation happens on a clone of the incoming object; the response patch is
//! the JSON diff between the two, so an admission that changes nothing
//! produces no patch at all.

use std::sync::Arc;

use axum::{extract::State, Json};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Container, EnvVar};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

use metal_common::{
    Error, Result, KUBE_APISERVER_DEPLOYMENT, NODE_NETWORK_ENV_VAR, VPN_SEED_CONTAINER,
    VPN_SEED_SERVER,
};
use metal_worker::cidr::{join_cidrs, parse_cidrs};

use crate::WebhookState;

/// Handle mutating admission review for Deployments
pub async fn mutate_deployment_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<Deployment>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<Deployment> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = mutate_deployment(&state, &request).await;
    Json(response.into_review())
}

/// Handle mutating admission review for StatefulSets
pub async fn mutate_stateful_set_handler(
    State(_state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<StatefulSet>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<StatefulSet> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = mutate_stateful_set(&request);
    Json(response.into_review())
}

async fn mutate_deployment(
    state: &WebhookState,
    request: &AdmissionRequest<Deployment>,
) -> AdmissionResponse {
    let Some(deploy) = &request.object else {
        return AdmissionResponse::from(request);
    };

    let name = deploy.name_any();
    let container_name = match name.as_str() {
        KUBE_APISERVER_DEPLOYMENT => VPN_SEED_CONTAINER,
        VPN_SEED_SERVER => VPN_SEED_SERVER,
        _ => return AdmissionResponse::from(request),
    };

    let mut mutated = deploy.clone();

    if let Some(containers) = deployment_containers_mut(&mut mutated) {
        let old_containers = request
            .old_object
            .as_ref()
            .map(deployment_containers)
            .unwrap_or_default();
        preserve_node_network(containers, old_containers, container_name);
    }

    // The dedicated VPN deployment also gets the recorded aggregate, when
    // the worker has recorded one.
    if name == VPN_SEED_SERVER {
        let namespace = deploy.namespace().unwrap_or_default();
        if let Err(e) = apply_recorded_aggregate(state, &namespace, &mut mutated).await {
            warn!(deployment = %name, namespace = %namespace, error = %e, "aggregate lookup failed");
            return AdmissionResponse::from(request).deny(e.to_string());
        }
    }

    patch_response(request, deploy, &mutated)
}

fn mutate_stateful_set(request: &AdmissionRequest<StatefulSet>) -> AdmissionResponse {
    let Some(sts) = &request.object else {
        return AdmissionResponse::from(request);
    };

    if sts.name_any() != VPN_SEED_SERVER {
        return AdmissionResponse::from(request);
    }

    let mut mutated = sts.clone();

    if let Some(containers) = stateful_set_containers_mut(&mut mutated) {
        let old_containers = request
            .old_object
            .as_ref()
            .map(stateful_set_containers)
            .unwrap_or_default();
        preserve_node_network(containers, old_containers, VPN_SEED_SERVER);
    }

    patch_response(request, sts, &mutated)
}

/// Copy `NODE_NETWORK` from the stored object when the incoming one lacks it.
///
/// A value already present on the incoming object was supplied during this
/// admission cycle and always wins; preservation only fills the gap left by
/// mutation logic that rebuilt the container list from scratch.
pub fn preserve_node_network(
    new_containers: &mut [Container],
    old_containers: &[Container],
    container_name: &str,
) {
    let Some(old_value) = old_containers
        .iter()
        .find(|c| c.name == container_name)
        .and_then(|c| env_value(c, NODE_NETWORK_ENV_VAR))
    else {
        return;
    };

    if old_value.is_empty() {
        return;
    }
    let old_value = old_value.to_string();

    let Some(container) = new_containers.iter_mut().find(|c| c.name == container_name) else {
        return;
    };

    let env = container.env.get_or_insert_with(Vec::new);
    if env.iter().any(|e| e.name == NODE_NETWORK_ENV_VAR) {
        return;
    }

    info!(container = %container_name, value = %old_value, "preserving routing environment across recreation");
    env.push(EnvVar {
        name: NODE_NETWORK_ENV_VAR.to_string(),
        value: Some(old_value),
        value_from: None,
    });
}

/// Re-apply the aggregate recorded on the Infrastructure status, when set.
async fn apply_recorded_aggregate(
    state: &WebhookState,
    namespace: &str,
    mutated: &mut Deployment,
) -> Result<()> {
    let Some(infra) = state.infra.infrastructure_for_namespace(namespace).await? else {
        debug!(namespace = %namespace, "no infrastructure for namespace");
        return Ok(());
    };

    let Some(nodes_cidr) = infra.status.and_then(|s| s.nodes_cidr) else {
        debug!(namespace = %namespace, "node cidr not recorded yet");
        return Ok(());
    };

    let canonical = join_cidrs(&parse_cidrs(&nodes_cidr));
    if let Some(containers) = deployment_containers_mut(mutated) {
        set_env_var(containers, VPN_SEED_SERVER, NODE_NETWORK_ENV_VAR, &canonical);
    }

    Ok(())
}

/// Find-or-create an env var on the named container.
pub fn set_env_var(containers: &mut [Container], container_name: &str, name: &str, value: &str) {
    let Some(container) = containers.iter_mut().find(|c| c.name == container_name) else {
        return;
    };

    let env = container.env.get_or_insert_with(Vec::new);
    match env.iter_mut().find(|e| e.name == name) {
        Some(entry) => entry.value = Some(value.to_string()),
        None => env.push(EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            value_from: None,
        }),
    }
}

fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
    container
        .env
        .as_ref()?
        .iter()
        .find(|e| e.name == name)
        .and_then(|e| e.value.as_deref())
}

fn deployment_containers(deploy: &Deployment) -> &[Container] {
    deploy
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|ps| ps.containers.as_slice())
        .unwrap_or_default()
}

fn deployment_containers_mut(deploy: &mut Deployment) -> Option<&mut Vec<Container>> {
    Some(&mut deploy.spec.as_mut()?.template.spec.as_mut()?.containers)
}

fn stateful_set_containers(sts: &StatefulSet) -> &[Container] {
    sts.spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .map(|ps| ps.containers.as_slice())
        .unwrap_or_default()
}

fn stateful_set_containers_mut(sts: &mut StatefulSet) -> Option<&mut Vec<Container>> {
    Some(&mut sts.spec.as_mut()?.template.spec.as_mut()?.containers)
}

/// Build the admission response: no diff, no patch.
fn patch_response<K>(request: &AdmissionRequest<K>, original: &K, mutated: &K) -> AdmissionResponse
where
    K: kube::Resource + serde::Serialize,
{
    let diff = match json_diff(original, mutated) {
        Ok(diff) => diff,
        Err(e) => return AdmissionResponse::from(request).deny(e.to_string()),
    };

    if diff.0.is_empty() {
        return AdmissionResponse::from(request);
    }

    match AdmissionResponse::from(request).with_patch(diff) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

fn json_diff<T: serde::Serialize>(original: &T, mutated: &T) -> Result<json_patch::Patch> {
    let original = serde_json::to_value(original).map_err(|e| Error::serialization(e.to_string()))?;
    let mutated = serde_json::to_value(mutated).map_err(|e| Error::serialization(e.to_string()))?;
    Ok(json_patch::diff(&original, &mutated))
}
