//! Failure stories
//!
//! Once the ManagedOCS has been read, every stage of a pass runs. When more
//! than one fails, the StorageCluster stage wins over the status stage, which
//! wins over the readiness stage.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use ocs_deployer::crd::ReconcileStrategy;
use ocs_deployer::readiness::{Readiness, NOT_RECONCILED_REASON};
use ocs_deployer::template::YamlTemplates;

use super::*;

fn foreign_controller() -> OwnerReference {
    OwnerReference {
        api_version: "ocs.openshift.io/v1".to_string(),
        kind: "OCSInitialization".to_string(),
        name: "ocsinit".to_string(),
        uid: "ocsinit-uid".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Story: nothing happens for a ManagedOCS that no longer exists
#[tokio::test]
async fn story_deleted_parent_ends_pass() {
    let harness = Harness::new();

    let err = harness.pass().await.unwrap_err();

    assert!(err.is_not_found());
    assert!(harness.store.storage_cluster(&child_key()).is_none());
    assert_eq!(
        harness.readiness.current(),
        Readiness::not_ready(NOT_RECONCILED_REASON)
    );
}

/// Story: a StorageCluster controlled by someone else is never taken over,
/// but status and readiness are still reported
#[tokio::test]
async fn story_foreign_owner_blocks_adoption() {
    let harness = Harness::new().with_managed_ocs("Strict");
    let mut sc = user_storage_cluster(Some("Ready"));
    sc.metadata.owner_references = Some(vec![foreign_controller()]);
    harness.store.insert_storage_cluster(sc);

    let err = harness.pass().await.unwrap_err();

    assert!(matches!(err, Error::Ownership { .. }));
    assert!(!err.is_retryable());
    assert_eq!(harness.child().spec.manage_nodes, Some(true));
    assert_eq!(harness.store.write_counts().storage_cluster_updates, 0);
    assert_eq!(harness.recorded_strategy(), Some(ReconcileStrategy::Strict));
    assert!(harness.readiness.current().is_ready());
}

/// Story: a failed status write is reported after the child has converged
#[tokio::test]
async fn story_status_failure_after_converging_child() {
    let harness = Harness::new().with_managed_ocs("Strict");
    harness.store.set_status_unavailable(true);

    let err = harness.pass().await.unwrap_err();

    assert!(matches!(err, Error::Kube(_)));
    assert!(err.is_retryable());
    assert_eq!(harness.child().spec, template_spec());
    assert_eq!(harness.recorded_strategy(), None);
    assert_eq!(
        harness.readiness.current(),
        Readiness::not_ready("StorageCluster not ready.")
    );

    harness.store.set_status_unavailable(false);
    harness.pass().await.unwrap();
    assert_eq!(harness.recorded_strategy(), Some(ReconcileStrategy::Strict));
}

/// Story: when the StorageCluster stage and the status write both fail, the
/// StorageCluster failure is the one reported
#[tokio::test]
async fn story_storage_cluster_failure_outranks_status_failure() {
    let broken = Arc::new(YamlTemplates::from_yaml("broken", "spec: ["));
    let harness = Harness::with_templates(broken).with_managed_ocs("Strict");
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(Some("Ready")));
    harness.store.set_status_unavailable(true);

    let err = harness.pass().await.unwrap_err();

    assert!(matches!(err, Error::Template { ref template, .. } if template == "broken"));
    assert_eq!(harness.store.write_counts().status_updates, 0);
    assert_eq!(harness.recorded_strategy(), None);
    assert!(harness.readiness.current().is_ready());
}

/// Story: conflicts that outlast the retry budget surface as retryable
#[tokio::test]
async fn story_persistent_conflicts_surface() {
    let harness = Harness::new().with_managed_ocs("Strict");
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(None));
    harness.store.inject_conflicts(100);

    let err = harness.pass().await.unwrap_err();

    assert!(err.is_conflict());
    assert!(err.is_retryable());
    assert_eq!(harness.child().spec.manage_nodes, Some(true));
    assert_eq!(harness.recorded_strategy(), Some(ReconcileStrategy::Strict));
}

/// Story: an unreachable store fails the pass without touching readiness
#[tokio::test]
async fn story_unreachable_store_fails_fast() {
    let harness = Harness::new().with_managed_ocs("Strict");
    harness.store.set_reads_unavailable(true);

    let err = harness.pass().await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(harness.store.write_counts().status_updates, 0);
    assert_eq!(
        harness.readiness.current(),
        Readiness::not_ready(NOT_RECONCILED_REASON)
    );
}

/// Story: a cancelled pass leaves the namespace as it found it
#[tokio::test]
async fn story_cancelled_pass_is_inert() {
    let harness = Harness::new().with_managed_ocs("Strict");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = reconcile_pass(&parent_key(), &harness.ctx, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { .. }));
    assert!(harness.store.storage_cluster(&child_key()).is_none());
}
