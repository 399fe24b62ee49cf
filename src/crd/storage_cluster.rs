//! StorageCluster resource model
//!
//! StorageCluster is owned by the OCS operator, not by us: we only model the
//! fields we read or template, and carry everything else through untouched
//! in flattened maps so a read-modify-write never drops data.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status phase the OCS operator reports once the cluster is usable
pub const READY_PHASE: &str = "Ready";

/// Desired configuration of a StorageCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ocs.openshift.io",
    version = "v1",
    kind = "StorageCluster",
    plural = "storageclusters",
    status = "StorageClusterStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// Whether the OCS operator labels and manages nodes itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_nodes: Option<bool>,

    /// Host path for monitor data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mon_data_dir_host_path: Option<String>,

    /// Device sets backing the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_device_sets: Vec<StorageDeviceSet>,

    /// Spec fields not modeled here
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A set of OSD devices provisioned from one PVC template
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageDeviceSet {
    /// Device set name
    pub name: String,

    /// Number of devices per replica
    #[serde(default)]
    pub count: u32,

    /// Replica count
    #[serde(default)]
    pub replica: u32,

    /// Device set fields not modeled here (dataPVCTemplate, placement, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Observed state of a StorageCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterStatus {
    /// Lifecycle phase reported by the OCS operator (free-form string)
    #[serde(default)]
    pub phase: String,

    /// Status fields not modeled here
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl StorageCluster {
    /// Current status phase, empty when no status was reported yet
    pub fn phase(&self) -> &str {
        self.status.as_ref().map(|s| s.phase.as_str()).unwrap_or("")
    }

    /// True iff the reported phase is exactly [`READY_PHASE`]
    pub fn is_ready(&self) -> bool {
        self.phase() == READY_PHASE
    }
}
