//! Resource definitions used by the operator
//!
//! `ManagedOcs` is our own CRD. `StorageCluster` belongs to the OCS operator
//! and is modeled here only so we can read and write it with typed APIs.

mod managed_ocs;
mod storage_cluster;

pub use managed_ocs::{ManagedOcs, ManagedOcsSpec, ManagedOcsStatus, ReconcileStrategy};
pub use storage_cluster::{
    StorageCluster, StorageClusterSpec, StorageClusterStatus, StorageDeviceSet, READY_PHASE,
};
