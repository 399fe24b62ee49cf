//! Reconcile scenarios
//!
//! Tests are organized by the story they tell:
//!
//! - `strict`: the StorageCluster is created from and held to the template
//! - `unmanaged`: user edits to the StorageCluster spec are left alone
//! - `readiness`: the StorageCluster phase drives operator readiness
//! - `failures`: how stage failures are ordered and what still happens

mod failures;
mod strict;
mod unmanaged;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ocs_deployer::config::ControllerConfig;
use ocs_deployer::controller::{reconcile_pass, Context, PassReport};
use ocs_deployer::crd::{
    ManagedOcs, ManagedOcsSpec, ReconcileStrategy, StorageCluster, StorageClusterSpec,
    StorageClusterStatus,
};
use ocs_deployer::readiness::ReadinessState;
use ocs_deployer::retry::RetryConfig;
use ocs_deployer::store::{MemoryStore, ObjectKey};
use ocs_deployer::template::{TemplateProvider, YamlTemplates};
use ocs_deployer::Error;
use tokio_util::sync::CancellationToken;

pub const NAMESPACE: &str = "openshift-storage";

/// A namespace with one ManagedOCS wired to an in-memory cluster
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub readiness: Arc<ReadinessState>,
    pub ctx: Context,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_templates(Arc::new(YamlTemplates::embedded()))
    }

    pub fn with_templates(templates: Arc<dyn TemplateProvider>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let readiness = Arc::new(ReadinessState::new());
        let ctx = Context::builder(store.clone())
            .templates(templates)
            .readiness(readiness.clone())
            .config(ControllerConfig::default().conflict_retry(fast_retry()))
            .build();
        Self {
            store,
            readiness,
            ctx,
        }
    }

    /// Seed the ManagedOCS with the requested strategy
    pub fn with_managed_ocs(self, strategy: &str) -> Self {
        self.store.insert_managed_ocs(managed_ocs(strategy));
        self
    }

    /// Change the requested strategy, as a user editing the resource would
    pub fn set_strategy(&self, strategy: &str) {
        let mut current = self
            .store
            .managed_ocs(&parent_key())
            .unwrap_or_else(|| managed_ocs(strategy));
        current.spec.reconcile_strategy = strategy.to_string();
        self.store.insert_managed_ocs(current);
    }

    pub async fn pass(&self) -> Result<PassReport, Error> {
        reconcile_pass(&parent_key(), &self.ctx, &CancellationToken::new()).await
    }

    pub fn child(&self) -> StorageCluster {
        self.store
            .storage_cluster(&child_key())
            .expect("StorageCluster should exist")
    }

    pub fn recorded_strategy(&self) -> Option<ReconcileStrategy> {
        self.store
            .managed_ocs(&parent_key())
            .and_then(|m| m.status)
            .and_then(|s| s.reconcile_strategy)
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

pub fn parent_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, "managedocs")
}

pub fn child_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, "ocs-storagecluster")
}

pub fn managed_ocs(strategy: &str) -> ManagedOcs {
    let mut managed = ManagedOcs::new(
        "managedocs",
        ManagedOcsSpec {
            reconcile_strategy: strategy.to_string(),
        },
    );
    managed.metadata.namespace = Some(NAMESPACE.to_string());
    managed
}

/// A StorageCluster as a user might have hand-edited it
pub fn user_storage_cluster(phase: Option<&str>) -> StorageCluster {
    let mut sc = StorageCluster::new(
        "ocs-storagecluster",
        StorageClusterSpec {
            manage_nodes: Some(true),
            mon_data_dir_host_path: Some("/srv/rook".to_string()),
            storage_device_sets: Vec::new(),
            extra: BTreeMap::from([(
                "encryption".to_string(),
                serde_json::json!({ "enable": true }),
            )]),
        },
    );
    sc.metadata.namespace = Some(NAMESPACE.to_string());
    sc.metadata.labels = Some(BTreeMap::from([(
        "app.kubernetes.io/part-of".to_string(),
        "storage".to_string(),
    )]));
    sc.metadata.annotations = Some(BTreeMap::from([(
        "example.com/owner-team".to_string(),
        "platform".to_string(),
    )]));
    sc.status = phase.map(|p| StorageClusterStatus {
        phase: p.to_string(),
        ..Default::default()
    });
    sc
}

pub fn template_spec() -> StorageClusterSpec {
    YamlTemplates::embedded()
        .storage_cluster()
        .expect("embedded template is valid")
        .spec
}
