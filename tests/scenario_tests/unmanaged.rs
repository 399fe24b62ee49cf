//! Unmanaged strategy stories
//!
//! Under Unmanaged the operator only guarantees the StorageCluster exists and
//! is owned by the ManagedOCS; its spec belongs to the user.

use std::sync::Arc;

use kube::ResourceExt;
use ocs_deployer::crd::{ReconcileStrategy, StorageClusterSpec};
use ocs_deployer::store::OperationResult;
use ocs_deployer::template::YamlTemplates;
use rstest::rstest;

use super::*;

/// Story: user edits survive, including fields the operator does not model
#[tokio::test]
async fn story_user_spec_is_preserved() {
    let harness = Harness::new().with_managed_ocs("Unmanaged");
    let before = harness
        .store
        .insert_storage_cluster(user_storage_cluster(None));

    let report = harness.pass().await.unwrap();

    assert_eq!(report.strategy, ReconcileStrategy::Unmanaged);
    let child = harness.child();
    assert_eq!(child.spec, before.spec);
    assert_eq!(
        child.spec.extra.get("encryption"),
        Some(&serde_json::json!({ "enable": true }))
    );
    assert_eq!(child.labels(), before.labels());
    assert_eq!(harness.recorded_strategy(), Some(ReconcileStrategy::Unmanaged));
}

/// Story: an adopted StorageCluster gains its owner reference and nothing else
#[tokio::test]
async fn story_existing_child_is_adopted() {
    let harness = Harness::new().with_managed_ocs("Unmanaged");
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(None));

    let first = harness.pass().await.unwrap();
    let second = harness.pass().await.unwrap();

    assert_eq!(first.storage_cluster, OperationResult::Updated);
    assert_eq!(second.storage_cluster, OperationResult::Unchanged);
    let refs = harness.child().owner_references().to_vec();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].name, "managedocs");
}

/// Story: a missing StorageCluster is still created, with an empty spec
#[tokio::test]
async fn story_missing_child_is_created_without_template() {
    let harness = Harness::new().with_managed_ocs("unmanaged");

    let report = harness.pass().await.unwrap();

    assert_eq!(report.storage_cluster, OperationResult::Created);
    assert_eq!(harness.child().spec, StorageClusterSpec::default());
}

/// Story: a broken template cannot block an Unmanaged pass
#[tokio::test]
async fn story_broken_template_is_ignored() {
    let broken = Arc::new(YamlTemplates::from_yaml("broken", "spec: ["));
    let harness = Harness::with_templates(broken).with_managed_ocs("Unmanaged");
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(Some("Ready")));

    let report = harness.pass().await.unwrap();

    assert!(report.readiness.is_ready());
}

/// Story: the strategy literal is matched without regard to case
#[rstest]
#[case::canonical("Unmanaged", ReconcileStrategy::Unmanaged)]
#[case::shouting("UNMANAGED", ReconcileStrategy::Unmanaged)]
#[case::empty("", ReconcileStrategy::Strict)]
#[case::unknown("manual", ReconcileStrategy::Strict)]
#[tokio::test]
async fn story_strategy_resolution(#[case] requested: &str, #[case] expected: ReconcileStrategy) {
    let harness = Harness::new().with_managed_ocs(requested);
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(None));

    let report = harness.pass().await.unwrap();

    assert_eq!(report.strategy, expected);
    assert_eq!(harness.recorded_strategy(), Some(expected));
    let spec_kept = harness.child().spec.manage_nodes == Some(true);
    assert_eq!(spec_kept, expected == ReconcileStrategy::Unmanaged);
}
