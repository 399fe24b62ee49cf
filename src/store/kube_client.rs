//! Kubernetes API implementation of [`ResourceStore`]

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};

use super::{key_of, ObjectKey, ResourceStore};
use crate::crd::{ManagedOcs, StorageCluster};
use crate::Error;

/// Real store talking to the API server through kube-rs
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    /// Create a store that writes as `field_manager`
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn managed_ocs_api(&self, namespace: &str) -> Api<ManagedOcs> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn storage_cluster_api(&self, namespace: &str) -> Api<StorageCluster> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_managed_ocs(&self, key: &ObjectKey) -> Result<ManagedOcs, Error> {
        self.managed_ocs_api(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| Error::from_kube(e, &ManagedOcs::kind(&()), key))
    }

    async fn update_managed_ocs_status(&self, managed_ocs: &ManagedOcs) -> Result<(), Error> {
        let key = key_of(managed_ocs)?;

        // Carrying the observed resourceVersion turns the merge patch into a
        // compare-and-swap: the API server rejects it with 409 if it moved.
        let mut patch = serde_json::json!({ "status": managed_ocs.status });
        if let Some(version) = managed_ocs.resource_version() {
            patch["metadata"] = serde_json::json!({ "resourceVersion": version });
        }

        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };

        self.managed_ocs_api(&key.namespace)
            .patch_status(&key.name, &params, &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, &ManagedOcs::kind(&()), &key))?;

        Ok(())
    }

    async fn get_storage_cluster(&self, key: &ObjectKey) -> Result<Option<StorageCluster>, Error> {
        self.storage_cluster_api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| Error::from_kube(e, &StorageCluster::kind(&()), key))
    }

    async fn create_storage_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, Error> {
        let key = key_of(sc)?;
        self.storage_cluster_api(&key.namespace)
            .create(&self.post_params(), sc)
            .await
            .map_err(|e| Error::from_kube(e, &StorageCluster::kind(&()), &key))
    }

    async fn update_storage_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, Error> {
        let key = key_of(sc)?;
        self.storage_cluster_api(&key.namespace)
            .replace(&key.name, &self.post_params(), sc)
            .await
            .map_err(|e| Error::from_kube(e, &StorageCluster::kind(&()), &key))
    }
}
