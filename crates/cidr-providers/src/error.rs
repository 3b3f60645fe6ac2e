//! CIDR provider errors

use crds::ValidationError;
use thiserror::Error;

/// Errors that can occur while fetching CIDRs from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("unexpected status: {0}")]
    UnexpectedStatus(String),

    /// Response body was not valid JSON
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Payload lacks a top-level key the selector needs
    #[error("missing {0}")]
    MissingField(&'static str),

    /// GitHub meta payload had no CIDRs under the requested roles
    #[error("no CIDRs found for roles: {}", .0.join(", "))]
    NoCidrsForRoles(Vec<String>),

    /// A field path segment resolved to something other than an object
    #[error("segment {0:?} not an object")]
    SegmentNotObject(String),

    /// A field path segment does not exist
    #[error("missing segment {0:?}")]
    MissingSegment(String),

    /// A list element is neither a string nor an object
    #[error("array value {0} is neither a string nor an object")]
    UnsupportedArrayElement(String),

    /// The field path resolved to a value that cannot hold CIDRs
    #[error("unsupported JSON field type {0}")]
    UnsupportedFieldType(&'static str),

    /// Nothing left after sanitisation
    #[error("provider returned no CIDRs")]
    Empty,

    /// Referenced cluster object does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// ConfigMap exists but lacks the configured key
    #[error("configmap missing key: {0}")]
    MissingKey(String),

    /// Secret exists but lacks the referenced key
    #[error("secret {secret} missing key {key}")]
    SecretMissingKey { secret: String, key: String },

    /// Reading a Secret failed
    #[error("fetching secret {secret}: {reason}")]
    SecretFetch { secret: String, reason: String },

    /// Provider needs cluster access but none was configured
    #[error("kube client not configured for {0}")]
    ClusterReaderUnavailable(&'static str),

    /// Header name or value is not valid HTTP
    #[error("invalid header {0}")]
    InvalidHeader(String),

    /// Provider declaration failed validation
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Fetch did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}
