//! OCS Deployer - keeps a StorageCluster in line with its ManagedOCS

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;

use ocs_deployer::config::{ControllerConfig, DEFAULT_STORAGE_CLUSTER_NAME};
use ocs_deployer::controller::{error_policy, reconcile, Context};
use ocs_deployer::crd::{ManagedOcs, StorageCluster};
use ocs_deployer::readiness::ReadinessState;
use ocs_deployer::store::KubeStore;
use ocs_deployer::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use ocs_deployer::template::YamlTemplates;

/// OCS Deployer - desired-state controller for ManagedOCS resources
#[derive(Parser, Debug)]
#[command(name = "ocs-deployer", version, about, long_about = None)]
struct Cli {
    /// Generate the ManagedOCS CRD manifest and exit
    #[arg(long)]
    crd: bool,

    /// Namespace to watch (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Name of the StorageCluster managed in each namespace
    #[arg(long, default_value = DEFAULT_STORAGE_CLUSTER_NAME)]
    storage_cluster_name: String,

    /// StorageCluster template overriding the embedded one
    #[arg(long, env = "STORAGECLUSTER_TEMPLATE")]
    template: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&ManagedOcs::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        service_name: "ocs-deployer".to_string(),
        log_format: cli.log_format,
    })?;

    run_controller(cli).await
}

/// Run the ManagedOCS controller until shutdown
async fn run_controller(cli: Cli) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let templates = match &cli.template {
        Some(path) => YamlTemplates::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to read template {:?}: {}", path, e))?,
        None => YamlTemplates::embedded(),
    };
    tracing::info!(source = templates.source(), "StorageCluster template loaded");

    let config = ControllerConfig::default().storage_cluster_name(cli.storage_cluster_name);
    let store = Arc::new(KubeStore::new(client.clone(), config.field_manager.clone()));
    let readiness = Arc::new(ReadinessState::new());
    let shutdown = CancellationToken::new();

    let ctx = Arc::new(
        Context::builder(store)
            .templates(Arc::new(templates))
            .readiness(readiness.clone())
            .config(config)
            .shutdown(shutdown.clone())
            .build(),
    );

    let (managed, owned): (Api<ManagedOcs>, Api<StorageCluster>) = match &cli.namespace {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    // In-flight passes stop at their next store call once a signal arrives;
    // the controller itself drains via shutdown_on_signal.
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    tracing::info!(
        namespace = cli.namespace.as_deref().unwrap_or("<all>"),
        "Starting ManagedOCS controller"
    );

    Controller::new(managed, WatcherConfig::default())
        .owns(owned, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok(action) => {
                    tracing::debug!(?action, "ManagedOCS reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "ManagedOCS reconciliation error");
                }
            }
        })
        .await;

    shutdown.cancel();
    tracing::info!(readiness = %readiness.current(), "OCS deployer shutting down");
    Ok(())
}
