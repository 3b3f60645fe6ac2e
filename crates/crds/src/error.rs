//! Validation errors for BotNetworkPolicy resources

use thiserror::Error;

/// Reasons a BotNetworkPolicy or one of its provider declarations is rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Discriminator did not name a known provider
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// A variant that needs a configuration block was declared without it
    #[error("{provider} provider requires {block} configuration")]
    MissingBlock {
        provider: &'static str,
        block: &'static str,
    },

    /// A required field in the configuration block is empty
    #[error("{provider} provider requires {fields}")]
    MissingFields {
        provider: &'static str,
        fields: &'static str,
    },

    /// A configuration block for a different variant was populated
    #[error("{provider} provider does not accept {block} configuration")]
    UnexpectedBlock {
        provider: String,
        block: &'static str,
    },

    /// `headerSecretRefs` entry is incomplete
    #[error("jsonEndpoint headerSecretRefs requires {0}")]
    HeaderSecretRef(&'static str),

    /// `syncPeriod` could not be parsed
    #[error("invalid syncPeriod {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },
}
