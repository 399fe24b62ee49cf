//! In-memory resource store
//!
//! Behaves like the API server for the handful of calls the reconcile core
//! makes: objects get a uid and a monotonically increasing `resourceVersion`,
//! writes with a stale version fail with a conflict, and the StorageCluster
//! status is only writable through [`MemoryStore::set_storage_cluster_phase`]
//! (replacing the main resource never touches status). Failures and
//! conflicts can be injected to exercise the error paths.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kube::core::ErrorResponse;
use kube::Resource;

use super::{key_of, ObjectKey, ResourceStore};
use crate::crd::{ManagedOcs, StorageCluster, StorageClusterStatus};
use crate::Error;

/// Number of writes the store has accepted, per operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCounts {
    /// Successful ManagedOCS status writes
    pub status_updates: u32,
    /// Successful StorageCluster creates
    pub storage_cluster_creates: u32,
    /// Successful StorageCluster replaces
    pub storage_cluster_updates: u32,
}

#[derive(Default)]
struct Inner {
    managed: BTreeMap<ObjectKey, ManagedOcs>,
    clusters: BTreeMap<ObjectKey, StorageCluster>,
    last_version: u64,
    last_uid: u64,
    pending_conflicts: u32,
    status_unavailable: bool,
    reads_unavailable: bool,
    counts: WriteCounts,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.last_version = self.last_version.saturating_add(1);
        self.last_version.to_string()
    }

    fn next_uid(&mut self) -> String {
        self.last_uid = self.last_uid.saturating_add(1);
        format!("00000000-0000-0000-0000-{:012}", self.last_uid)
    }
}

/// [`ResourceStore`] backed by in-process maps
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a ManagedOCS, assigning uid and resourceVersion like the API server
    ///
    /// Objects without a namespace or name are ignored and returned unchanged.
    pub fn insert_managed_ocs(&self, mut managed_ocs: ManagedOcs) -> ManagedOcs {
        let Some(key) = ObjectKey::of(&managed_ocs) else {
            return managed_ocs;
        };
        let mut inner = self.lock();
        if managed_ocs.metadata.uid.is_none() {
            managed_ocs.metadata.uid = Some(inner.next_uid());
        }
        managed_ocs.metadata.resource_version = Some(inner.next_version());
        inner.managed.insert(key, managed_ocs.clone());
        managed_ocs
    }

    /// Seed a StorageCluster, including its status
    ///
    /// Objects without a namespace or name are ignored and returned unchanged.
    pub fn insert_storage_cluster(&self, mut sc: StorageCluster) -> StorageCluster {
        let Some(key) = ObjectKey::of(&sc) else {
            return sc;
        };
        let mut inner = self.lock();
        if sc.metadata.uid.is_none() {
            sc.metadata.uid = Some(inner.next_uid());
        }
        sc.metadata.resource_version = Some(inner.next_version());
        inner.clusters.insert(key, sc.clone());
        sc
    }

    /// Report a phase on a stored StorageCluster, as the OCS operator would
    ///
    /// Returns false when no StorageCluster exists at `key`.
    pub fn set_storage_cluster_phase(&self, key: &ObjectKey, phase: &str) -> bool {
        let mut inner = self.lock();
        let version = inner.next_version();
        match inner.clusters.get_mut(key) {
            Some(sc) => {
                sc.status
                    .get_or_insert_with(StorageClusterStatus::default)
                    .phase = phase.to_string();
                sc.metadata.resource_version = Some(version);
                true
            }
            None => false,
        }
    }

    /// Snapshot of a stored ManagedOCS
    pub fn managed_ocs(&self, key: &ObjectKey) -> Option<ManagedOcs> {
        self.lock().managed.get(key).cloned()
    }

    /// Snapshot of a stored StorageCluster
    pub fn storage_cluster(&self, key: &ObjectKey) -> Option<StorageCluster> {
        self.lock().clusters.get(key).cloned()
    }

    /// Fail the next `count` StorageCluster updates with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.lock().pending_conflicts = count;
    }

    /// Make ManagedOCS status writes fail with a transient error
    pub fn set_status_unavailable(&self, unavailable: bool) {
        self.lock().status_unavailable = unavailable;
    }

    /// Make every read fail with a transient error
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.lock().reads_unavailable = unavailable;
    }

    /// Writes accepted so far
    pub fn write_counts(&self) -> WriteCounts {
        self.lock().counts
    }
}

fn unavailable(message: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "ServiceUnavailable".to_string(),
        code: 503,
    }))
}

fn stale<K: Resource<DynamicType = ()>>(obj: &K, stored: &K) -> bool {
    obj.meta().resource_version.is_some()
        && obj.meta().resource_version != stored.meta().resource_version
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_managed_ocs(&self, key: &ObjectKey) -> Result<ManagedOcs, Error> {
        let inner = self.lock();
        if inner.reads_unavailable {
            return Err(unavailable("store unavailable"));
        }
        inner
            .managed
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(ManagedOcs::kind(&()), key))
    }

    async fn update_managed_ocs_status(&self, managed_ocs: &ManagedOcs) -> Result<(), Error> {
        let key = key_of(managed_ocs)?;
        let mut inner = self.lock();
        if inner.status_unavailable {
            return Err(unavailable("status subresource unavailable"));
        }
        let version = inner.next_version();
        let stored = inner
            .managed
            .get_mut(&key)
            .ok_or_else(|| Error::not_found(ManagedOcs::kind(&()), &key))?;
        if stale(managed_ocs, stored) {
            return Err(Error::conflict(
                ManagedOcs::kind(&()),
                &key,
                "the object has been modified",
            ));
        }
        stored.status = managed_ocs.status.clone();
        stored.metadata.resource_version = Some(version);
        inner.counts.status_updates = inner.counts.status_updates.saturating_add(1);
        Ok(())
    }

    async fn get_storage_cluster(&self, key: &ObjectKey) -> Result<Option<StorageCluster>, Error> {
        let inner = self.lock();
        if inner.reads_unavailable {
            return Err(unavailable("store unavailable"));
        }
        Ok(inner.clusters.get(key).cloned())
    }

    async fn create_storage_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, Error> {
        let key = key_of(sc)?;
        let mut inner = self.lock();
        if inner.clusters.contains_key(&key) {
            return Err(Error::conflict(
                StorageCluster::kind(&()),
                &key,
                "already exists",
            ));
        }
        let mut created = sc.clone();
        created.metadata.uid = Some(inner.next_uid());
        created.metadata.resource_version = Some(inner.next_version());
        // status is a subresource; create never sets it
        created.status = None;
        inner.clusters.insert(key, created.clone());
        inner.counts.storage_cluster_creates =
            inner.counts.storage_cluster_creates.saturating_add(1);
        Ok(created)
    }

    async fn update_storage_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, Error> {
        let key = key_of(sc)?;
        let mut inner = self.lock();
        if inner.pending_conflicts > 0 {
            inner.pending_conflicts = inner.pending_conflicts.saturating_sub(1);
            return Err(Error::conflict(
                StorageCluster::kind(&()),
                &key,
                "the object has been modified",
            ));
        }
        let version = inner.next_version();
        let stored = inner
            .clusters
            .get_mut(&key)
            .ok_or_else(|| Error::not_found(StorageCluster::kind(&()), &key))?;
        if stale(sc, stored) {
            return Err(Error::conflict(
                StorageCluster::kind(&()),
                &key,
                "the object has been modified",
            ));
        }
        let status = stored.status.take();
        *stored = sc.clone();
        stored.status = status;
        stored.metadata.resource_version = Some(version);
        let updated = stored.clone();
        inner.counts.storage_cluster_updates =
            inner.counts.storage_cluster_updates.saturating_add(1);
        Ok(updated)
    }
}
