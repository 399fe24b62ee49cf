//! Resource store abstraction
//!
//! The reconcile core never talks to the Kubernetes API directly. It goes
//! through [`ResourceStore`], a narrow per-kind interface with
//! optimistic-concurrency semantics (every write carries the
//! `resourceVersion` it was derived from and fails with
//! [`Error::Conflict`] if the object moved underneath it).
//!
//! [`create_or_update_storage_cluster`] layers the fetch-mutate-write upsert
//! on top of those primitives and absorbs conflicts by re-running the whole
//! cycle against a fresh copy.

mod kube_client;
mod memory;

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::crd::{ManagedOcs, StorageCluster, StorageClusterSpec};
use crate::retry::{retry_with_backoff_if, RetryConfig};
use crate::Error;

pub use kube_client::KubeStore;
pub use memory::{MemoryStore, WriteCounts};

/// Namespaced identity of a resource
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace the resource lives in
    pub namespace: String,
    /// Resource name
    pub name: String,
}

impl ObjectKey {
    /// Create a key from namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object, `None` for cluster-scoped or unnamed objects
    pub fn of<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// What the create-or-update primitive did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    /// Object was absent and has been created
    Created,
    /// Object existed and differed from the mutated copy
    Updated,
    /// Object already matched, nothing was written
    Unchanged,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Trait abstracting resource persistence for the reconcile core
///
/// Implemented by [`KubeStore`] against the API server and by
/// [`MemoryStore`] for tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a ManagedOCS; absence is [`Error::NotFound`]
    async fn get_managed_ocs(&self, key: &ObjectKey) -> Result<ManagedOcs, Error>;

    /// Persist the status subresource of a ManagedOCS
    async fn update_managed_ocs_status(&self, managed_ocs: &ManagedOcs) -> Result<(), Error>;

    /// Fetch a StorageCluster if it exists
    async fn get_storage_cluster(&self, key: &ObjectKey) -> Result<Option<StorageCluster>, Error>;

    /// Create a StorageCluster; fails with [`Error::Conflict`] if it already exists
    async fn create_storage_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, Error>;

    /// Replace a StorageCluster guarded by its `resourceVersion`
    async fn update_storage_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, Error>;
}

/// Key of an object about to be written, which must be named and namespaced
pub(crate) fn key_of<K: Resource<DynamicType = ()>>(obj: &K) -> Result<ObjectKey, Error> {
    ObjectKey::of(obj).ok_or_else(|| {
        Error::serialization(format!(
            "{} is missing metadata.name or metadata.namespace",
            K::kind(&())
        ))
    })
}

/// Run a store operation, giving up as soon as the pass is cancelled
pub async fn guarded<T, F>(cancel: &CancellationToken, operation: &str, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    if cancel.is_cancelled() {
        return Err(Error::cancelled(operation));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled(operation)),
        result = fut => result,
    }
}

/// Create the StorageCluster at `key` or bring the existing one in line.
///
/// Fetches the current object (or starts from an empty one), applies
/// `mutate`, then creates it if absent or updates it if the mutation changed
/// anything. Conflicts re-run the full cycle per `retry`; the last conflict is
/// returned once attempts are exhausted. Errors from `mutate` abort without
/// writing. Cancellation during a backoff ends the call with a Cancelled
/// error.
pub async fn create_or_update_storage_cluster<F>(
    store: &dyn ResourceStore,
    key: &ObjectKey,
    retry: &RetryConfig,
    cancel: &CancellationToken,
    mutate: F,
) -> Result<(StorageCluster, OperationResult), Error>
where
    F: Fn(&mut StorageCluster) -> Result<(), Error>,
{
    let mutate = &mutate;
    retry_with_backoff_if(
        retry,
        "create or update StorageCluster",
        cancel,
        || upsert_once(store, key, cancel, mutate),
        Error::is_conflict,
    )
    .await
    .map_err(|e| {
        if e.is_conflict() && cancel.is_cancelled() {
            Error::cancelled("create or update StorageCluster")
        } else {
            e
        }
    })
}

async fn upsert_once<F>(
    store: &dyn ResourceStore,
    key: &ObjectKey,
    cancel: &CancellationToken,
    mutate: &F,
) -> Result<(StorageCluster, OperationResult), Error>
where
    F: Fn(&mut StorageCluster) -> Result<(), Error>,
{
    let current = guarded(cancel, "get StorageCluster", store.get_storage_cluster(key)).await?;

    match current {
        None => {
            let mut sc = StorageCluster::new(&key.name, StorageClusterSpec::default());
            sc.metadata.namespace = Some(key.namespace.clone());
            mutate(&mut sc)?;

            let created = guarded(
                cancel,
                "create StorageCluster",
                store.create_storage_cluster(&sc),
            )
            .await?;
            debug!(storage_cluster = %key, "StorageCluster created");
            Ok((created, OperationResult::Created))
        }
        Some(existing) => {
            let mut sc = existing.clone();
            mutate(&mut sc)?;

            if sc == existing {
                debug!(storage_cluster = %key, "StorageCluster already up to date");
                return Ok((existing, OperationResult::Unchanged));
            }

            let updated = guarded(
                cancel,
                "update StorageCluster",
                store.update_storage_cluster(&sc),
            )
            .await?;
            debug!(
                storage_cluster = %key,
                resource_version = ?updated.resource_version(),
                "StorageCluster updated"
            );
            Ok((updated, OperationResult::Updated))
        }
    }
}
