//! Desired StorageCluster state per reconcile strategy

use tracing::debug;

use super::ownership::bind_owner;
use crate::crd::{ManagedOcs, ReconcileStrategy, StorageCluster, StorageClusterSpec};
use crate::template::TemplateProvider;
use crate::Error;

/// Spec the StorageCluster must carry under `strategy`.
///
/// `Strict` instantiates the template; `Unmanaged` enforces no spec at all
/// and never touches the template, so a broken template cannot block it.
pub fn desired_spec(
    strategy: ReconcileStrategy,
    templates: &dyn TemplateProvider,
) -> Result<Option<StorageClusterSpec>, Error> {
    match strategy {
        ReconcileStrategy::Strict => Ok(Some(templates.storage_cluster()?.spec)),
        ReconcileStrategy::Unmanaged => Ok(None),
    }
}

/// Mutation applied to the live StorageCluster during create-or-update.
///
/// Binds `owner` as controller and, when a desired spec is given, replaces
/// the whole spec with it. Metadata other than owner references and the
/// status are never touched.
pub fn apply_desired_state(
    owner: &ManagedOcs,
    desired: Option<&StorageClusterSpec>,
    sc: &mut StorageCluster,
) -> Result<(), Error> {
    bind_owner(owner, sc)?;
    if let Some(spec) = desired {
        debug!("overwriting StorageCluster spec from template");
        sc.spec = spec.clone();
    }
    Ok(())
}
