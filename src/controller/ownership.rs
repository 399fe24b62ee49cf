//! Controller owner references
//!
//! The ManagedOCS is recorded as the controlling owner of its StorageCluster
//! so the child is garbage collected with the parent and child events map
//! back to the parent's reconcile queue.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::crd::{ManagedOcs, StorageCluster};
use crate::Error;

/// Mark `owner` as the controlling owner of `child`.
///
/// Idempotent: a child already controlled by `owner` is left byte-identical.
/// An existing reference to the same owner (same group, kind and name) is
/// refreshed in place so a re-created parent adopts its old child. Fails when
/// the owner has no UID yet, when the two live in different namespaces, or
/// when some other object already controls the child.
pub fn bind_owner(owner: &ManagedOcs, child: &mut StorageCluster) -> Result<(), Error> {
    let owner_name = owner.name_any();
    let child_name = child.name_any();
    let fail = |message: String| Error::ownership(&owner_name, &child_name, message);

    let mut owner_ref = owner
        .controller_owner_ref(&())
        .ok_or_else(|| fail("owner has no uid".to_string()))?;
    // foreground deletion of the ManagedOCS waits for the StorageCluster
    owner_ref.block_owner_deletion = Some(true);

    if owner.namespace() != child.namespace() {
        return Err(fail(format!(
            "cross-namespace owner references are not allowed ({:?} vs {:?})",
            owner.namespace(),
            child.namespace()
        )));
    }

    let refs = child.metadata.owner_references.get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && !same_owner(r, &owner_ref))
    {
        return Err(fail(format!(
            "already owned by {} {}",
            other.kind, other.name
        )));
    }

    match refs.iter().position(|r| same_owner(r, &owner_ref)) {
        Some(index) => refs[index] = owner_ref,
        None => refs.push(owner_ref),
    }
    Ok(())
}

/// Owner references identify the same object when group, kind and name agree
fn same_owner(a: &OwnerReference, b: &OwnerReference) -> bool {
    api_group(&a.api_version) == api_group(&b.api_version) && a.kind == b.kind && a.name == b.name
}

fn api_group(api_version: &str) -> &str {
    api_version
        .rsplit_once('/')
        .map(|(group, _)| group)
        .unwrap_or("")
}
