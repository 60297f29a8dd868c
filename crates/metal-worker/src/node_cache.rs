//! Per-node CIDR cache backed by a node annotation.
//!
//! Cloud API calls are rate limited, so a node's resolved CIDR is cached in
//! an annotation on first success and trusted from then on. The annotation
//! is never re-resolved once present.

use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use tracing::{debug, info};

use metal_cloud::DeviceReader;
use metal_common::retry::{retry_on_conflict, RetryConfig};
use metal_common::{Result, PRIVATE_NETWORK_ANNOTATION};

use crate::kube_access::WorkerKube;
use crate::provider_id::device_id_from_provider_id;
use crate::resolver::resolve_private_network;

/// Return the node's private CIDR, resolving and caching it when absent.
///
/// `None` means the node contributes nothing this cycle: its providerID is
/// foreign/empty or its device has no private network yet. Resolver errors
/// propagate and abort the caller's whole cycle.
pub async fn ensure_node_cidr(
    kube: &dyn WorkerKube,
    devices: &dyn DeviceReader,
    retry: &RetryConfig,
    node: &Node,
) -> Result<Option<String>> {
    if let Some(cached) = node.annotations().get(PRIVATE_NETWORK_ANNOTATION) {
        if !cached.is_empty() {
            return Ok(Some(cached.clone()));
        }
    }

    let provider_id = node
        .spec
        .as_ref()
        .and_then(|s| s.provider_id.clone())
        .unwrap_or_default();

    let device_id = match device_id_from_provider_id(&provider_id)? {
        Some(id) => id,
        None => {
            debug!(node = %node.name_any(), provider_id = %provider_id, "no usable providerID, skipping node");
            return Ok(None);
        }
    };

    let cidr = match resolve_private_network(devices, &device_id).await? {
        Some(cidr) => cidr,
        None => {
            debug!(node = %node.name_any(), device_id = %device_id, "device has no private network yet");
            return Ok(None);
        }
    };

    let node_name = node.name_any();
    retry_on_conflict(retry, "patch node annotation", || {
        kube.patch_node_annotation(&node_name, PRIVATE_NETWORK_ANNOTATION, &cidr)
    })
    .await?;

    info!(node = %node_name, cidr = %cidr, "cached private network annotation");
    Ok(Some(cidr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube_access::MockWorkerKube;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::NodeSpec;
    use kube::core::ErrorResponse;
    use metal_cloud::{Device, IpAddress, ParentBlock};
    use metal_common::Error;
    use mockall::mock;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    mock! {
        Devices {}

        #[async_trait]
        impl DeviceReader for Devices {
            async fn get_device(&self, device_id: &str) -> Result<Device>;
        }
    }

    fn node(name: &str, provider_id: Option<&str>, annotation: Option<&str>) -> Node {
        let mut node = Node {
            spec: Some(NodeSpec {
                provider_id: provider_id.map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        };
        node.metadata.name = Some(name.to_string());
        if let Some(cidr) = annotation {
            node.annotations_mut()
                .insert(PRIVATE_NETWORK_ANNOTATION.to_string(), cidr.to_string());
        }
        node
    }

    fn resolvable_device(cidr_network: &str, prefix: u8) -> Device {
        Device {
            id: "dev-1".to_string(),
            ip_addresses: vec![IpAddress {
                address: "10.0.0.3".to_string(),
                public: false,
                management: true,
                address_family: 4,
                parent_block: Some(ParentBlock {
                    network: Some(cidr_network.to_string()),
                    cidr: Some(prefix),
                }),
            }],
        }
    }

    #[tokio::test]
    async fn cached_annotation_skips_resolution() {
        let kube = MockWorkerKube::new();
        let devices = MockDevices::new(); // no expectations: any call panics

        let node = node("worker-0", Some("equinixmetal://dev-1"), Some("10.0.0.0/23"));
        let cidr = ensure_node_cidr(&kube, &devices, &RetryConfig::default(), &node)
            .await
            .unwrap();

        assert_eq!(cidr.as_deref(), Some("10.0.0.0/23"));
    }

    #[tokio::test]
    async fn resolves_and_patches_uncached_node() {
        let mut kube = MockWorkerKube::new();
        kube.expect_patch_node_annotation()
            .with(eq("worker-0"), eq(PRIVATE_NETWORK_ANNOTATION), eq("10.0.0.0/23"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut devices = MockDevices::new();
        devices
            .expect_get_device()
            .with(eq("dev-1"))
            .returning(|_| Ok(resolvable_device("10.0.0.0", 23)));

        let node = node("worker-0", Some("equinixmetal://dev-1"), None);
        let cidr = ensure_node_cidr(&kube, &devices, &RetryConfig::default(), &node)
            .await
            .unwrap();

        assert_eq!(cidr.as_deref(), Some("10.0.0.0/23"));
    }

    #[tokio::test]
    async fn foreign_provider_is_skipped_without_api_calls() {
        let kube = MockWorkerKube::new();
        let devices = MockDevices::new();

        let node = node("worker-0", Some("othercloud://abc"), None);
        let cidr = ensure_node_cidr(&kube, &devices, &RetryConfig::default(), &node)
            .await
            .unwrap();

        assert_eq!(cidr, None);
    }

    #[tokio::test]
    async fn unprovisioned_device_contributes_nothing() {
        let kube = MockWorkerKube::new();
        let mut devices = MockDevices::new();
        devices.expect_get_device().returning(|_| {
            Ok(Device {
                id: "dev-1".to_string(),
                ip_addresses: vec![],
            })
        });

        let node = node("worker-0", Some("equinixmetal://dev-1"), None);
        let cidr = ensure_node_cidr(&kube, &devices, &RetryConfig::default(), &node)
            .await
            .unwrap();

        assert_eq!(cidr, None);
    }

    #[tokio::test]
    async fn annotation_conflict_is_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();

        let mut kube = MockWorkerKube::new();
        kube.expect_patch_node_annotation()
            .times(2)
            .returning(move |_, _, _| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Kube {
                        source: kube::Error::Api(ErrorResponse {
                            status: "Failure".into(),
                            message: "the object has been modified".into(),
                            reason: "Conflict".into(),
                            code: 409,
                        }),
                    })
                } else {
                    Ok(())
                }
            });

        let mut devices = MockDevices::new();
        devices
            .expect_get_device()
            .returning(|_| Ok(resolvable_device("10.0.0.0", 23)));

        let retry = RetryConfig {
            initial_delay: std::time::Duration::from_millis(1),
            ..RetryConfig::default()
        };

        let node = node("worker-0", Some("equinixmetal://dev-1"), None);
        let cidr = ensure_node_cidr(&kube, &devices, &retry, &node).await.unwrap();

        assert_eq!(cidr.as_deref(), Some("10.0.0.0/23"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolver_failure_aborts() {
        let kube = MockWorkerKube::new();
        let mut devices = MockDevices::new();
        devices
            .expect_get_device()
            .returning(|_| Err(Error::cloud_api("dev-1", "rate limited")));

        let node = node("worker-0", Some("equinixmetal://dev-1"), None);
        let err = ensure_node_cidr(&kube, &devices, &RetryConfig::default(), &node)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }
}
