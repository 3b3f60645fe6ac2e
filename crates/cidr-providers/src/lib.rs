//! CIDR Providers
//!
//! Fetches IP ranges for the BotNetworkPolicy operator from cloud IP range
//! feeds (Google, AWS, GitHub), ConfigMaps and arbitrary JSON endpoints.
//!
//! # Example
//!
//! ```no_run
//! use cidr_providers::ProviderFactory;
//! use crds::ProviderSpec;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = ProviderFactory::new(reqwest::Client::new(), None);
//! let spec = ProviderSpec {
//!     name: "github".to_string(),
//!     ..Default::default()
//! };
//! let provider = factory.from_spec("default", &spec)?;
//! let cidrs = provider.fetch_with_timeout(Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod factory;
pub mod json_path;
pub mod kube_reader;
pub mod provider;
#[path = "trait.rs"]
pub mod reader_trait;
pub mod sanitize;
pub mod selector;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use error::ProviderError;
pub use factory::{DefaultEndpoints, ProviderFactory};
pub use kube_reader::KubeClusterReader;
pub use provider::Provider;
pub use reader_trait::ClusterReader;
pub use sanitize::{sanitize, split_cidrs};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockClusterReader;
