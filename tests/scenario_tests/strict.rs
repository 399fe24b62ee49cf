//! Strict strategy stories
//!
//! Under Strict the template is the source of truth for the StorageCluster
//! spec. Everything outside the spec belongs to whoever else touches the
//! object and must survive.

use std::sync::Arc;

use kube::ResourceExt;
use ocs_deployer::crd::ReconcileStrategy;
use ocs_deployer::readiness::Readiness;
use ocs_deployer::store::OperationResult;
use ocs_deployer::template::YamlTemplates;

use super::*;

/// Story: a fresh namespace gets its StorageCluster from the template
#[tokio::test]
async fn story_first_pass_creates_storage_cluster_from_template() {
    let harness = Harness::new().with_managed_ocs("");

    let report = harness.pass().await.unwrap();

    assert_eq!(report.strategy, ReconcileStrategy::Strict);
    assert_eq!(report.storage_cluster, OperationResult::Created);

    let child = harness.child();
    assert_eq!(child.name_any(), "ocs-storagecluster");
    assert_eq!(child.namespace().as_deref(), Some(NAMESPACE));
    assert_eq!(child.spec, template_spec());

    let owner = &child.owner_references()[0];
    assert_eq!(owner.kind, "ManagedOCS");
    assert_eq!(owner.name, "managedocs");
    assert_eq!(owner.controller, Some(true));

    assert_eq!(harness.recorded_strategy(), Some(ReconcileStrategy::Strict));
    assert_eq!(
        harness.readiness.current(),
        Readiness::not_ready("StorageCluster not ready.")
    );
}

/// Story: drift in the spec is reverted, labels, annotations and status stay
#[tokio::test]
async fn story_strict_reverts_spec_drift_only() {
    let harness = Harness::new().with_managed_ocs("Strict");
    let before = harness
        .store
        .insert_storage_cluster(user_storage_cluster(Some("Ready")));

    let report = harness.pass().await.unwrap();

    assert_eq!(report.storage_cluster, OperationResult::Updated);
    let child = harness.child();
    assert_eq!(child.spec, template_spec());
    assert!(!child.spec.extra.contains_key("encryption"));
    assert_eq!(child.labels(), before.labels());
    assert_eq!(child.annotations(), before.annotations());
    assert_eq!(child.uid(), before.uid());
    assert_eq!(child.phase(), "Ready");
    assert_eq!(report.readiness, Readiness::Ready);
}

/// Story: once converged, further passes write nothing to the StorageCluster
#[tokio::test]
async fn story_converged_passes_are_idempotent() {
    let harness = Harness::new().with_managed_ocs("Strict");
    harness.pass().await.unwrap();
    let first = harness.child();

    let second = harness.pass().await.unwrap();
    let third = harness.pass().await.unwrap();

    assert_eq!(second.storage_cluster, OperationResult::Unchanged);
    assert_eq!(third.storage_cluster, OperationResult::Unchanged);
    assert_eq!(harness.child(), first);

    let counts = harness.store.write_counts();
    assert_eq!(counts.storage_cluster_creates, 1);
    assert_eq!(counts.storage_cluster_updates, 0);
    assert_eq!(counts.status_updates, 3);
}

/// Story: an operator-supplied template replaces the built-in one
#[tokio::test]
async fn story_template_override_is_enforced() {
    let yaml = r#"
apiVersion: ocs.openshift.io/v1
kind: StorageCluster
metadata:
  name: ignored
spec:
  manageNodes: true
  storageDeviceSets:
    - name: large
      count: 4
      replica: 3
"#;
    let harness = Harness::with_templates(Arc::new(YamlTemplates::from_yaml("custom", yaml)))
        .with_managed_ocs("Strict");

    harness.pass().await.unwrap();

    let child = harness.child();
    assert_eq!(child.name_any(), "ocs-storagecluster");
    assert_eq!(child.spec.manage_nodes, Some(true));
    assert_eq!(child.spec.storage_device_sets[0].name, "large");
    assert_eq!(child.spec.storage_device_sets[0].count, 4);
}

/// Story: concurrent writers cause conflicts that the pass absorbs
#[tokio::test]
async fn story_write_conflicts_are_retried() {
    let harness = Harness::new().with_managed_ocs("Strict");
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(None));
    harness.store.inject_conflicts(2);

    let report = harness.pass().await.unwrap();

    assert_eq!(report.storage_cluster, OperationResult::Updated);
    assert_eq!(harness.child().spec, template_spec());
}

/// Story: switching from Unmanaged back to Strict reclaims the spec
#[tokio::test]
async fn story_switching_to_strict_reclaims_spec() {
    let harness = Harness::new().with_managed_ocs("Unmanaged");
    harness
        .store
        .insert_storage_cluster(user_storage_cluster(None));
    harness.pass().await.unwrap();
    assert_eq!(harness.child().spec.manage_nodes, Some(true));

    harness.set_strategy("Strict");
    let report = harness.pass().await.unwrap();

    assert_eq!(report.strategy, ReconcileStrategy::Strict);
    assert_eq!(harness.child().spec, template_spec());
    assert_eq!(harness.recorded_strategy(), Some(ReconcileStrategy::Strict));
}
