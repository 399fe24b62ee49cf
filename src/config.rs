//! Controller configuration

use std::time::Duration;

use crate::retry::RetryConfig;
use crate::store::ObjectKey;

/// Name of the single StorageCluster managed per namespace
///
/// Every ManagedOCS in a namespace drives the StorageCluster with this name
/// in that same namespace, so there is at most one managed StorageCluster
/// per namespace regardless of how the ManagedOCS itself is named.
pub const DEFAULT_STORAGE_CLUSTER_NAME: &str = "ocs-storagecluster";

/// Field manager recorded on every write
pub const DEFAULT_FIELD_MANAGER: &str = "ocs-deployer";

/// Requeue delay after a retryable reconcile error
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Tunables for the ManagedOCS controller
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Name of the StorageCluster owned by each namespace's ManagedOCS
    pub storage_cluster_name: String,
    /// Field manager for API writes
    pub field_manager: String,
    /// Requeue delay used by the error policy for retryable errors
    pub error_requeue: Duration,
    /// Retry policy for optimistic-concurrency conflicts
    pub conflict_retry: RetryConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            storage_cluster_name: DEFAULT_STORAGE_CLUSTER_NAME.to_string(),
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            error_requeue: DEFAULT_ERROR_REQUEUE,
            conflict_retry: RetryConfig::conflict(),
        }
    }
}

impl ControllerConfig {
    /// Set the managed StorageCluster name
    pub fn storage_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.storage_cluster_name = name.into();
        self
    }

    /// Set the field manager
    pub fn field_manager(mut self, manager: impl Into<String>) -> Self {
        self.field_manager = manager.into();
        self
    }

    /// Set the error requeue delay
    pub fn error_requeue(mut self, delay: Duration) -> Self {
        self.error_requeue = delay;
        self
    }

    /// Set the conflict retry policy
    pub fn conflict_retry(mut self, retry: RetryConfig) -> Self {
        self.conflict_retry = retry;
        self
    }

    /// Key of the StorageCluster managed in `namespace`
    pub fn storage_cluster_key(&self, namespace: &str) -> ObjectKey {
        ObjectKey::new(namespace, &self.storage_cluster_name)
    }
}
