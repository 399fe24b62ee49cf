//! Process-wide readiness signal
//!
//! The reconcile loop pushes a verdict after every pass; whatever serves the
//! readiness probe reads it back through [`ReadinessState::subscribe`] or
//! [`ReadinessState::current`]. Serving the probe itself is left to that
//! transport.

use std::fmt;

use tokio::sync::watch;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// Reason reported before the first reconcile pass has completed
pub const NOT_RECONCILED_REASON: &str = "Reconcile has not run yet.";

/// Binary readiness verdict
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The managed StorageCluster is ready
    Ready,
    /// Not ready, with a human-readable reason
    NotReady {
        /// Why readiness is withheld
        reason: String,
    },
}

impl Readiness {
    /// Not-ready verdict with the given reason
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady {
            reason: reason.into(),
        }
    }

    /// True for [`Readiness::Ready`]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::NotReady { reason } => write!(f, "NotReady({})", reason),
        }
    }
}

/// Sink receiving readiness verdicts from the reconcile loop
///
/// Both operations are idempotent.
#[cfg_attr(test, automock)]
pub trait ReadinessSink: Send + Sync {
    /// Report the operator as ready
    fn set_ready(&self);

    /// Report the operator as not ready
    fn unset_ready(&self, reason: &str);
}

/// Shared readiness state backed by a watch channel
pub struct ReadinessState {
    tx: watch::Sender<Readiness>,
}

impl ReadinessState {
    /// Start out not ready until a pass reports otherwise
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Readiness::not_ready(NOT_RECONCILED_REASON));
        Self { tx }
    }

    /// Latest verdict
    pub fn current(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every verdict change
    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.tx.subscribe()
    }

    fn publish(&self, next: Readiness) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            info!(readiness = %next, "Readiness changed");
        } else {
            debug!(readiness = %next, "Readiness unchanged");
        }
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSink for ReadinessState {
    fn set_ready(&self) {
        self.publish(Readiness::Ready);
    }

    fn unset_ready(&self, reason: &str) {
        self.publish(Readiness::not_ready(reason));
    }
}
