//! ManagedOCS controller implementation
//!
//! This module contains the reconciliation logic for ManagedOCS resources.
//! A pass runs three stages in a fixed order, each of which always runs once
//! the parent has been read:
//!
//! 1. bring the StorageCluster in line with the recorded strategy,
//! 2. persist the ManagedOCS status,
//! 3. push the StorageCluster's readiness to the readiness sink.
//!
//! When several stages fail the first failure in that order is returned.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::desired::{apply_desired_state, desired_spec};
use super::readiness::evaluate_readiness;
use crate::config::ControllerConfig;
use crate::crd::{ManagedOcs, ReconcileStrategy};
use crate::readiness::{Readiness, ReadinessSink, ReadinessState};
use crate::store::{
    create_or_update_storage_cluster, guarded, ObjectKey, OperationResult, ResourceStore,
};
use crate::template::{TemplateProvider, YamlTemplates};
use crate::Error;

/// Controller context containing shared state and clients
///
/// The context is shared across all reconciliation calls and holds
/// resources that are expensive to create (like the store backend).
///
/// Use [`ContextBuilder`] for flexible construction.
pub struct Context {
    /// Resource persistence (trait object for testability)
    pub store: Arc<dyn ResourceStore>,
    /// Desired-state templates
    pub templates: Arc<dyn TemplateProvider>,
    /// Destination for readiness verdicts
    pub readiness: Arc<dyn ReadinessSink>,
    /// Controller tunables
    pub config: ControllerConfig,
    /// Cancelled when the process shuts down; each pass runs on a child token
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a builder for constructing a Context over `store`
    pub fn builder(store: Arc<dyn ResourceStore>) -> ContextBuilder {
        ContextBuilder::new(store)
    }

    /// Create a context for testing with custom mocks
    ///
    /// This method is primarily for unit tests. For production code,
    /// use [`Context::builder`].
    #[cfg(test)]
    pub fn for_testing(
        store: Arc<dyn ResourceStore>,
        templates: Arc<dyn TemplateProvider>,
        readiness: Arc<dyn ReadinessSink>,
    ) -> Self {
        Self::builder(store)
            .templates(templates)
            .readiness(readiness)
            .config(ControllerConfig::default().conflict_retry(crate::retry::RetryConfig {
                max_attempts: 3,
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(5),
                backoff_multiplier: 2.0,
            }))
            .build()
    }
}

/// Builder for [`Context`]
pub struct ContextBuilder {
    store: Arc<dyn ResourceStore>,
    templates: Option<Arc<dyn TemplateProvider>>,
    readiness: Option<Arc<dyn ReadinessSink>>,
    config: ControllerConfig,
    shutdown: Option<CancellationToken>,
}

impl ContextBuilder {
    fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            templates: None,
            readiness: None,
            config: ControllerConfig::default(),
            shutdown: None,
        }
    }

    /// Override the templates (defaults to the embedded ones)
    pub fn templates(mut self, templates: Arc<dyn TemplateProvider>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Override the readiness sink (defaults to a fresh [`ReadinessState`])
    pub fn readiness(mut self, readiness: Arc<dyn ReadinessSink>) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Set the controller configuration
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Tie reconcile passes to a process-wide shutdown token
    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            store: self.store,
            templates: self
                .templates
                .unwrap_or_else(|| Arc::new(YamlTemplates::embedded())),
            readiness: self
                .readiness
                .unwrap_or_else(|| Arc::new(ReadinessState::new())),
            config: self.config,
            shutdown: self.shutdown.unwrap_or_else(CancellationToken::new),
        }
    }
}

/// Outcome of a successful reconcile pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// Strategy applied and recorded in status
    pub strategy: ReconcileStrategy,
    /// What happened to the StorageCluster
    pub storage_cluster: OperationResult,
    /// Verdict pushed to the readiness sink
    pub readiness: Readiness,
}

/// Run one reconcile pass for the ManagedOCS at `key`.
///
/// A missing ManagedOCS ends the pass immediately with [`Error::NotFound`]
/// and touches nothing else. Otherwise all three stages run even if earlier
/// ones fail, and the first error in stage order is returned.
pub async fn reconcile_pass(
    key: &ObjectKey,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<PassReport, Error> {
    info!(managed_ocs = %key, "Reconciling ManagedOCS");

    let mut managed_ocs = guarded(cancel, "get ManagedOCS", ctx.store.get_managed_ocs(key)).await?;
    let child_key = ctx.config.storage_cluster_key(&key.namespace);

    let phase = reconcile_storage_cluster(&mut managed_ocs, &child_key, ctx, cancel).await;
    if let Err(e) = &phase {
        warn!(error = %e, storage_cluster = %child_key, "StorageCluster reconcile failed");
    }

    let status = guarded(
        cancel,
        "update ManagedOCS status",
        ctx.store.update_managed_ocs_status(&managed_ocs),
    )
    .await;
    if let Err(e) = &status {
        warn!(error = %e, "ManagedOCS status update failed");
    }

    let readiness = evaluate_readiness(
        ctx.store.as_ref(),
        ctx.readiness.as_ref(),
        &child_key,
        cancel,
    )
    .await;

    let (strategy, storage_cluster) = phase?;
    status?;
    let readiness = readiness?;

    Ok(PassReport {
        strategy,
        storage_cluster,
        readiness,
    })
}

/// Record the strategy and converge the StorageCluster on it.
///
/// The strategy lands in the in-memory status before anything can fail, so
/// the status stage persists it even when this stage errors.
async fn reconcile_storage_cluster(
    managed_ocs: &mut ManagedOcs,
    child_key: &ObjectKey,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<(ReconcileStrategy, OperationResult), Error> {
    let strategy = managed_ocs.effective_strategy();
    managed_ocs.record_strategy(strategy);

    info!(
        reconcile_strategy = %strategy,
        storage_cluster = %child_key,
        "Reconciling storagecluster"
    );

    let desired = desired_spec(strategy, ctx.templates.as_ref())?;
    let owner: &ManagedOcs = managed_ocs;

    let (_, result) = create_or_update_storage_cluster(
        ctx.store.as_ref(),
        child_key,
        &ctx.config.conflict_retry,
        cancel,
        |sc| apply_desired_state(owner, desired.as_ref(), sc),
    )
    .await?;

    info!(storage_cluster = %child_key, operation = %result, "StorageCluster reconciled");
    Ok((strategy, result))
}

/// Reconcile a ManagedOCS resource
///
/// Entry point for the kube-rs controller runtime. Each invocation runs one
/// pass on a child of the shutdown token, so an in-flight pass stops at its
/// next store call once shutdown begins.
///
/// A successful pass waits for the next change: the controller also watches
/// owned StorageClusters, so phase transitions trigger a new pass.
#[instrument(skip(managed_ocs, ctx), fields(managed_ocs = %managed_ocs.name_any()))]
pub async fn reconcile(managed_ocs: Arc<ManagedOcs>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = ObjectKey::of(managed_ocs.as_ref())
        .ok_or_else(|| Error::serialization("ManagedOCS is missing metadata.namespace"))?;

    let cancel = ctx.shutdown.child_token();
    let report = reconcile_pass(&key, &ctx, &cancel).await?;

    info!(
        strategy = %report.strategy,
        storage_cluster = %report.storage_cluster,
        readiness = %report.readiness,
        "reconcile pass complete"
    );
    Ok(Action::await_change())
}

/// Error policy for the controller
///
/// Transient failures (API errors, conflicts that outlived the retry budget)
/// requeue after the configured delay. Everything else needs a change to the
/// ManagedOCS, its StorageCluster or the operator deployment before another
/// pass can succeed, so it waits for one.
pub fn error_policy(managed_ocs: Arc<ManagedOcs>, error: &Error, ctx: Arc<Context>) -> Action {
    if error.is_retryable() {
        warn!(
            ?error,
            managed_ocs = %managed_ocs.name_any(),
            requeue_after = ?ctx.config.error_requeue,
            "reconciliation failed, will retry"
        );
        Action::requeue(ctx.config.error_requeue)
    } else {
        error!(
            ?error,
            managed_ocs = %managed_ocs.name_any(),
            "reconciliation failed"
        );
        Action::await_change()
    }
}
