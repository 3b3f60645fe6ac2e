//! BotNetworkPolicy CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the BotNetworkPolicy operator.

pub mod bot_network_policy;
pub mod duration;
pub mod error;
pub mod provider;

pub use bot_network_policy::*;
pub use duration::parse_duration;
pub use error::ValidationError;
pub use provider::*;

/// API group shared by the CRD and its annotations/labels
pub const API_GROUP: &str = "bot.networking.dev";
