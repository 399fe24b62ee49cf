//! OCS Deployer - desired-state controller for managed OpenShift Container Storage
//!
//! A ManagedOCS resource is the parent configuration. For each one the
//! controller keeps a single StorageCluster in the same namespace under its
//! ownership and, depending on the requested strategy, forces that
//! StorageCluster's spec to match a template. The StorageCluster's phase is
//! reported back as the operator's readiness.
//!
//! # Reconcile strategies
//!
//! - `Strict` (default) - the StorageCluster spec is overwritten from the
//!   template on every pass
//! - `Unmanaged` - the StorageCluster is created if missing and kept owned,
//!   but its spec is left to the user
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (ManagedOCS, StorageCluster)
//! - [`controller`] - Kubernetes controller reconciliation logic
//! - [`store`] - Resource persistence (kube-rs and in-memory backends)
//! - [`template`] - Desired-state templates
//! - [`readiness`] - Process-wide readiness signal
//! - [`config`] - Controller configuration
//! - [`retry`] - Backoff for optimistic-concurrency conflicts
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod readiness;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod template;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
