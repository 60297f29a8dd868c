//! Equinix Metal extension - private network discovery and VPN route convergence

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};

use metal_common::crd::Infrastructure;
use metal_common::telemetry::{init_telemetry, TelemetryConfig};
use metal_common::ExtensionConfig;
use metal_webhook::{webhook_router, WebhookState};
use metal_worker::{error_policy, reconcile, Context, WorkerKubeImpl};

/// Watcher timeout (seconds) - must be less than the client read timeout so
/// the API server closes idle watches before the client gives up on them.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Gardener-style provider extension for Equinix Metal tenant clusters
#[derive(Parser, Debug)]
#[command(name = "metal-extension", version, about, long_about = None)]
struct Cli {
    /// Generate the Infrastructure CRD manifest and exit
    #[arg(long)]
    crd: bool,

    /// Listen address for the admission webhook server
    #[arg(long, default_value = "0.0.0.0:9443")]
    webhook_addr: SocketAddr,

    /// Requeue interval after a successful reconcile, in seconds
    #[arg(long, default_value_t = 300)]
    requeue_seconds: u64,

    /// Requeue interval after a failed reconcile, in seconds
    #[arg(long, default_value_t = 30)]
    error_requeue_seconds: u64,

    /// Override for the Equinix Metal API base URL
    #[arg(long)]
    metal_api_url: Option<String>,

    /// Emit plain-text logs instead of JSON
    #[arg(long)]
    plain_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        json: !cli.plain_logs,
    })?;

    if cli.crd {
        println!("{}", serde_yaml::to_string(&Infrastructure::crd())?);
        return Ok(());
    }

    let config = ExtensionConfig {
        requeue_interval: Duration::from_secs(cli.requeue_seconds),
        error_requeue_interval: Duration::from_secs(cli.error_requeue_seconds),
        metal_api_base_url: cli.metal_api_url.clone(),
        ..Default::default()
    };

    let client = Client::try_default().await?;

    run(client, config, cli.webhook_addr).await
}

async fn run(client: Client, config: ExtensionConfig, webhook_addr: SocketAddr) -> anyhow::Result<()> {
    let ctx = Arc::new(Context::new(
        Arc::new(WorkerKubeImpl::new(client.clone())),
        config,
    ));

    let infrastructures: Api<Infrastructure> = Api::all(client.clone());

    tracing::info!("starting Infrastructure controller");
    let controller = Controller::new(
        infrastructures,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .shutdown_on_signal()
    .run(reconcile, error_policy, ctx)
    .for_each(|result| async move {
        match result {
            Ok((obj, _)) => tracing::debug!(object = %obj, "reconciled"),
            Err(e) => tracing::warn!(error = %e, "reconcile dispatch failed"),
        }
    });

    tracing::info!(addr = %webhook_addr, "starting admission webhook server");
    let state = Arc::new(WebhookState::new(client));
    let listener = tokio::net::TcpListener::bind(webhook_addr).await?;
    let server = axum::serve(listener, webhook_router(state)).into_future();

    tokio::select! {
        _ = controller => {
            tracing::info!("controller stream ended, shutting down");
        }
        result = server => {
            result?;
        }
    }

    Ok(())
}
