//! Infrastructure status recorder.
//!
//! `status.nodesCIDR` is the handoff point read by the control-plane
//! webhook; it is only ever rewritten when the aggregate actually changed,
//! so unchanged cycles leave the object generation alone.

use tracing::{debug, info};

use metal_common::retry::{retry_on_conflict, RetryConfig};
use metal_common::{Error, Result};

use crate::kube_access::WorkerKube;

/// Record the joined aggregate on the Infrastructure status.
///
/// Compares against a freshly-read object and merge-patches only the status
/// subresource when the value differs. Returns whether a patch was issued.
pub async fn record_nodes_cidr(
    kube: &dyn WorkerKube,
    retry: &RetryConfig,
    infra_name: &str,
    joined: &str,
) -> Result<bool> {
    let infra = kube.get_infrastructure(infra_name).await?.ok_or_else(|| {
        Error::internal(
            "status",
            format!("infrastructure {infra_name} disappeared during reconcile"),
        )
    })?;

    let current = infra
        .status
        .as_ref()
        .and_then(|s| s.nodes_cidr.as_deref())
        .unwrap_or_default();

    if current == joined {
        debug!(infrastructure = %infra_name, "nodes CIDR unchanged, skipping status patch");
        return Ok(false);
    }

    let mut status = infra.status.clone().unwrap_or_default();
    status.nodes_cidr = if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    };

    retry_on_conflict(retry, "patch infrastructure status", || {
        kube.patch_infrastructure_status(infra_name, &status)
    })
    .await?;

    info!(infrastructure = %infra_name, nodes_cidr = %joined, "recorded nodes CIDR");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube_access::MockWorkerKube;
    use metal_common::crd::{Infrastructure, InfrastructureSpec, InfrastructureStatus};
    use mockall::predicate::eq;

    fn infra(nodes_cidr: Option<&str>) -> Infrastructure {
        let mut infra = Infrastructure::new(
            "shoot--core--prod",
            InfrastructureSpec {
                region: "dc13".to_string(),
                namespace: "shoot--core--prod".to_string(),
                secret_name: None,
            },
        );
        infra.status = Some(InfrastructureStatus {
            nodes_cidr: nodes_cidr.map(str::to_string),
            ssh_key_id: Some("key-1".to_string()),
        });
        infra
    }

    #[tokio::test]
    async fn unchanged_aggregate_is_not_written() {
        let mut kube = MockWorkerKube::new();
        kube.expect_get_infrastructure()
            .with(eq("shoot--core--prod"))
            .returning(|_| Ok(Some(infra(Some("10.0.1.0/24")))));
        // no patch expectation: issuing one fails the test

        let patched = record_nodes_cidr(
            &kube,
            &RetryConfig::default(),
            "shoot--core--prod",
            "10.0.1.0/24",
        )
        .await
        .unwrap();

        assert!(!patched);
    }

    #[tokio::test]
    async fn changed_aggregate_patches_status_only() {
        let mut kube = MockWorkerKube::new();
        kube.expect_get_infrastructure()
            .returning(|_| Ok(Some(infra(Some("10.0.1.0/24")))));
        kube.expect_patch_infrastructure_status()
            .withf(|name, status| {
                // other status fields ride along untouched
                name == "shoot--core--prod"
                    && status.nodes_cidr.as_deref() == Some("10.0.1.0/24,10.0.2.0/24")
                    && status.ssh_key_id.as_deref() == Some("key-1")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let patched = record_nodes_cidr(
            &kube,
            &RetryConfig::default(),
            "shoot--core--prod",
            "10.0.1.0/24,10.0.2.0/24",
        )
        .await
        .unwrap();

        assert!(patched);
    }

    #[tokio::test]
    async fn first_aggregate_is_written() {
        let mut kube = MockWorkerKube::new();
        kube.expect_get_infrastructure()
            .returning(|_| Ok(Some(infra(None))));
        kube.expect_patch_infrastructure_status()
            .times(1)
            .returning(|_, _| Ok(()));

        let patched = record_nodes_cidr(
            &kube,
            &RetryConfig::default(),
            "shoot--core--prod",
            "10.0.0.0/23",
        )
        .await
        .unwrap();

        assert!(patched);
    }

    #[tokio::test]
    async fn missing_infrastructure_is_an_error() {
        let mut kube = MockWorkerKube::new();
        kube.expect_get_infrastructure().returning(|_| Ok(None));

        let err = record_nodes_cidr(&kube, &RetryConfig::default(), "gone", "10.0.0.0/23")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("gone"));
    }
}
