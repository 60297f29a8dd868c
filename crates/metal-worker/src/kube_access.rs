//! Narrow Kubernetes access trait for the worker reconciler.
//!
//! The reconcile logic is written against [`WorkerKube`] so it can run
//! under test with a mock instead of a live cluster. The real
//! implementation wraps a `kube::Client` and maps 404s on optional
//! resources to `None`.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Node, Secret};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;

#[cfg(test)]
use mockall::automock;

use metal_common::crd::{Infrastructure, InfrastructureStatus};
use metal_common::{Result, FIELD_MANAGER};

/// Kubernetes operations the worker reconcile cycle needs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkerKube: Send + Sync {
    /// List all nodes of the tenant cluster
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// Strategic-merge patch a single annotation onto a node
    async fn patch_node_annotation(&self, node_name: &str, key: &str, value: &str) -> Result<()>;

    /// Get an Infrastructure by name, `None` when absent
    async fn get_infrastructure(&self, name: &str) -> Result<Option<Infrastructure>>;

    /// Merge-patch only the status subresource of an Infrastructure
    async fn patch_infrastructure_status(
        &self,
        name: &str,
        status: &InfrastructureStatus,
    ) -> Result<()>;

    /// Get a Deployment, `None` when absent
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>>;

    /// Get a StatefulSet, `None` when absent
    async fn get_stateful_set(&self, namespace: &str, name: &str)
        -> Result<Option<StatefulSet>>;

    /// Strategic-merge patch one env var of one container in a Deployment
    async fn patch_deployment_env(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        env_name: &str,
        env_value: &str,
    ) -> Result<()>;

    /// Get a Secret (credentials); absence is an error here
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;
}

/// Real Kubernetes client implementation
pub struct WorkerKubeImpl {
    client: Client,
}

impl WorkerKubeImpl {
    /// Wrap a `kube::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkerKube for WorkerKubeImpl {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        Ok(nodes.items)
    }

    async fn patch_node_annotation(&self, node_name: &str, key: &str, value: &str) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let patch = serde_json::json!({
            "metadata": {
                "annotations": { key: value }
            }
        });

        api.patch(
            node_name,
            &PatchParams::default(),
            &Patch::Strategic(&patch),
        )
        .await?;
        Ok(())
    }

    async fn get_infrastructure(&self, name: &str) -> Result<Option<Infrastructure>> {
        let api: Api<Infrastructure> = Api::all(self.client.clone());
        match api.get(name).await {
            Ok(infra) => Ok(Some(infra)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_infrastructure_status(
        &self,
        name: &str,
        status: &InfrastructureStatus,
    ) -> Result<()> {
        let api: Api<Infrastructure> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "status": status });

        api.patch_status(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(deploy) => Ok(Some(deploy)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_stateful_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<StatefulSet>> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(sts) => Ok(Some(sts)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_deployment_env(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        env_name: &str,
        env_value: &str,
    ) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        // Strategic merge keys containers by name and env entries by name,
        // so this touches exactly one variable of one container.
        let patch = serde_json::json!({
            "spec": {
                "template": {
                    "spec": {
                        "containers": [{
                            "name": container,
                            "env": [{ "name": env_name, "value": env_value }]
                        }]
                    }
                }
            }
        });

        api.patch(name, &PatchParams::default(), &Patch::Strategic(&patch))
            .await?;
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }
}
