//! ManagedOCS Custom Resource Definition
//!
//! A ManagedOCS is the parent configuration resource. One per namespace
//! drives a single StorageCluster in the same namespace.

use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a ManagedOCS
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ocs.openshift.io",
    version = "v1alpha1",
    kind = "ManagedOCS",
    root = "ManagedOcs",
    plural = "managedocs",
    status = "ManagedOcsStatus",
    derive = "PartialEq",
    namespaced,
    printcolumn = r#"{"name":"Strategy","type":"string","jsonPath":".status.reconcileStrategy"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedOcsSpec {
    /// Requested reconcile strategy
    ///
    /// Kept as free text: anything other than a case-insensitive
    /// `Unmanaged` is treated as `Strict`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reconcile_strategy: String,
}

/// Status for a ManagedOCS
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedOcsStatus {
    /// Strategy actually applied during the last reconcile pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconcile_strategy: Option<ReconcileStrategy>,
}

/// How aggressively the operator manages the StorageCluster spec
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ReconcileStrategy {
    /// Overwrite the child spec from the template on every pass
    #[default]
    Strict,
    /// Leave the child spec alone, only keep ownership in place
    Unmanaged,
}

impl ReconcileStrategy {
    /// Resolve the strategy that applies for a raw spec value.
    ///
    /// Only a case-insensitive match of `Unmanaged` opts out of full
    /// management; empty and unrecognized values fall back to `Strict`.
    pub fn effective(requested: &str) -> Self {
        if requested.eq_ignore_ascii_case(Self::Unmanaged.as_str()) {
            Self::Unmanaged
        } else {
            Self::Strict
        }
    }

    /// Canonical string form, as written to status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Unmanaged => "Unmanaged",
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ManagedOcs {
    /// Strategy for this pass, derived fresh from the spec
    pub fn effective_strategy(&self) -> ReconcileStrategy {
        ReconcileStrategy::effective(&self.spec.reconcile_strategy)
    }

    /// Record the applied strategy on the in-memory status
    pub fn record_strategy(&mut self, strategy: ReconcileStrategy) {
        self.status
            .get_or_insert_with(ManagedOcsStatus::default)
            .reconcile_strategy = Some(strategy);
    }
}
