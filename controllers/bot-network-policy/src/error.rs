//! Controller-specific error types.
//!
//! Provider failures never surface here: they are downgraded to warnings
//! while collecting CIDRs. What remains are cluster and apply failures that
//! the watcher retries with backoff.

use thiserror::Error;
use kube::Error as KubeError;

/// Errors that can occur in the BotNetworkPolicy Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Target NetworkPolicy belongs to something else
    #[error("networkpolicy {namespace}/{name} exists and is not controlled by BotNetworkPolicy")]
    OwnershipConflict { namespace: String, name: String },

    /// Resource lacks metadata needed to own a NetworkPolicy
    #[error("BotNetworkPolicy {0} has no {1}")]
    MissingMetadata(String, &'static str),
}
