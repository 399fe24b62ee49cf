//! Error types for the ManagedOCS operator

use thiserror::Error;

/// Main error type for reconciliation
///
/// Each variant maps to a distinct handling policy in the controller's
/// error policy: store errors and conflicts are retried with backoff, while
/// missing resources, bad templates and broken ownership wait for a change.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested resource does not exist in the store
    #[error("{kind} {key} not found")]
    NotFound {
        /// Resource kind (e.g. "ManagedOCS")
        kind: String,
        /// Namespaced key of the missing resource
        key: String,
    },

    /// Optimistic-concurrency mismatch on write
    #[error("conflict writing {kind} {key}: {message}")]
    Conflict {
        /// Resource kind being written
        kind: String,
        /// Namespaced key of the resource
        key: String,
        /// Message reported by the store
        message: String,
    },

    /// The desired-state template is missing or malformed
    #[error("template error [{template}]: {message}")]
    Template {
        /// Template identifier
        template: String,
        /// What went wrong
        message: String,
    },

    /// The owner reference could not be applied to the child
    #[error("ownership error: {owner} cannot own {child}: {message}")]
    Ownership {
        /// Owner resource description
        owner: String,
        /// Child resource description
        child: String,
        /// Why the relationship is invalid
        message: String,
    },

    /// Kubernetes API error that is not a 404 or 409
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The reconcile pass was cancelled before the operation finished
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was interrupted
        operation: String,
    },
}

impl Error {
    /// Create a not-found error for the given kind and key
    pub fn not_found(kind: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Create a conflict error for the given kind and key
    pub fn conflict(kind: impl Into<String>, key: impl ToString, msg: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key: key.to_string(),
            message: msg.into(),
        }
    }

    /// Create a template error
    pub fn template(template: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: msg.into(),
        }
    }

    /// Create an ownership error
    pub fn ownership(
        owner: impl Into<String>,
        child: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Ownership {
            owner: owner.into(),
            child: child.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a cancellation error for the named operation
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Classify a kube-rs error for a specific resource
    ///
    /// 404 becomes [`Error::NotFound`], 409 becomes [`Error::Conflict`] and
    /// everything else stays a transient [`Error::Kube`].
    pub fn from_kube(source: kube::Error, kind: &str, key: impl ToString) -> Self {
        match source {
            kube::Error::Api(ae) if ae.code == 404 => Self::not_found(kind, key),
            kube::Error::Api(ae) if ae.code == 409 => Self::conflict(kind, key, ae.message),
            other => Self::Kube(other),
        }
    }

    /// True for optimistic-concurrency conflicts
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// True when a resource was absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error is retryable
    ///
    /// Store connectivity errors and exhausted conflicts may succeed on a later
    /// pass. Missing resources, templates and ownership need a change first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(source) => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Conflict { .. } => true,
            Error::NotFound { .. } => false,
            Error::Template { .. } => false,
            Error::Ownership { .. } => false,
            Error::Serialization(_) => false,
            Error::Cancelled { .. } => false,
        }
    }
}
