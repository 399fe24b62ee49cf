//! Controller implementation for the ManagedOCS CRD
//!
//! The controller follows the Kubernetes controller pattern: observe the
//! ManagedOCS, derive the desired StorageCluster, converge the live object on
//! it and report what it sees back through status and readiness.

mod desired;
mod managed_ocs;
mod ownership;
mod readiness;

pub use desired::{apply_desired_state, desired_spec};
pub use managed_ocs::{
    error_policy, reconcile, reconcile_pass, Context, ContextBuilder, PassReport,
};
pub use ownership::bind_owner;
pub use readiness::{evaluate_readiness, readiness_of};
