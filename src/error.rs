//! Error types for the IngressTemplate operator
//!
//! Errors are structured with fields to aid debugging in production. The
//! dispatcher's error policy uses [`Error::requeue_after`] to decide when a
//! failed reconcile is retried; the reconciler itself never retries.

use std::time::Duration;

use thiserror::Error;

use crate::template::RenderError;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// HTTP status the API server returns for stale writes
const CONFLICT_STATUS: u16 = 409;

/// Requeue delay after an optimistic-concurrency conflict
const REQUEUE_CONFLICT: Duration = Duration::from_secs(1);

/// Requeue delay after a transient failure
const REQUEUE_TRANSIENT: Duration = Duration::from_secs(5);

/// Main error type for IngressTemplate reconciliation
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error on a read
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A template field failed to render
    #[error("render error for {template}: {source}")]
    Render {
        /// IngressTemplate being rendered
        template: String,
        /// The failing field and its cause
        source: RenderError,
    },

    /// The IngressTemplate spec is unusable as written
    #[error("validation error for {template}: {message}")]
    Validation {
        /// IngressTemplate with invalid configuration
        template: String,
        /// Description of what's invalid
        message: String,
    },

    /// The object was modified between read and write
    #[error("conflict writing {resource}: {message}")]
    Conflict {
        /// Resource being written (e.g. "Ingress test/sample")
        resource: String,
        /// Message returned by the API server
        message: String,
    },

    /// The API server rejected creating or updating the Ingress
    #[error("apply error for Ingress {ingress}: {message}")]
    Apply {
        /// Ingress being applied
        ingress: String,
        /// Description of what failed
        message: String,
        /// Whether a later attempt may succeed without a spec change
        retryable: bool,
    },

    /// Persisting the IngressTemplate status failed
    #[error("status update error for {template}: {message}")]
    StatusUpdate {
        /// IngressTemplate whose status could not be written
        template: String,
        /// Description of what failed
        message: String,
    },

    /// A store call did not finish before its deadline
    #[error("timed out after {timeout:?} during {operation}")]
    Timeout {
        /// The store operation that timed out
        operation: String,
        /// The deadline that was exceeded
        timeout: Duration,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a render error for a template
    pub fn render_for(template: impl Into<String>, source: RenderError) -> Self {
        Self::Render {
            template: template.into(),
            source,
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            template: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error for a specific template
    pub fn validation_for(template: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            template: template.into(),
            message: msg.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a retryable apply error for an Ingress
    pub fn apply_for(ingress: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Apply {
            ingress: ingress.into(),
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create an apply error that needs a spec or cluster change to resolve
    pub fn apply_permanent(ingress: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Apply {
            ingress: ingress.into(),
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create a status update error
    pub fn status_update_for(template: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StatusUpdate {
            template: template.into(),
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Classify a failed Ingress create/update
    ///
    /// Stale writes become [`Error::Conflict`]; 4xx rejections other than
    /// conflicts need a spec change; everything else may succeed later.
    pub fn from_apply(ingress: impl Into<String>, err: kube::Error) -> Self {
        let ingress = ingress.into();
        match &err {
            kube::Error::Api(ae) if ae.code == CONFLICT_STATUS => {
                Self::conflict(format!("Ingress {ingress}"), ae.message.clone())
            }
            kube::Error::Api(ae) if (400..500).contains(&ae.code) => {
                Self::apply_permanent(ingress, err.to_string())
            }
            _ => Self::apply_for(ingress, err.to_string()),
        }
    }

    /// Classify a failed IngressTemplate status write
    pub fn from_status_update(template: impl Into<String>, err: kube::Error) -> Self {
        let template = template.into();
        match &err {
            kube::Error::Api(ae) if ae.code == CONFLICT_STATUS => {
                Self::conflict(format!("IngressTemplate {template}"), ae.message.clone())
            }
            _ => Self::status_update_for(template, err.to_string()),
        }
    }

    /// Check if this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this error is retryable
    ///
    /// Render and validation errors are not retryable (require a spec fix).
    /// Kubernetes errors depend on the status code.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                // Don't retry on 4xx errors (validation, forbidden, ...)
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::Render { .. } => false,
            Error::Validation { .. } => false,
            Error::Conflict { .. } => true,
            Error::Apply { retryable, .. } => *retryable,
            Error::StatusUpdate { .. } => true,
            Error::Timeout { .. } => true,
            Error::Internal { .. } => true,
        }
    }

    /// Delay before the dispatcher should re-run the whole cycle
    ///
    /// `None` means wait for the next change to the IngressTemplate or its
    /// Ingress instead of retrying on a timer.
    pub fn requeue_after(&self) -> Option<Duration> {
        if self.is_conflict() {
            Some(REQUEUE_CONFLICT)
        } else if self.is_retryable() {
            Some(REQUEUE_TRANSIENT)
        } else {
            None
        }
    }

    /// Get the IngressTemplate name if this error is associated with one
    pub fn template(&self) -> Option<&str> {
        match self {
            Error::Render { template, .. }
            | Error::Validation { template, .. }
            | Error::StatusUpdate { template, .. } => Some(template),
            _ => None,
        }
    }
}
