//! BotNetworkPolicy Controller
//!
//! Keeps one NetworkPolicy per `BotNetworkPolicy` resource, admitting the
//! IP ranges published by bot and cloud providers (Google, AWS, GitHub),
//! ConfigMaps, JSON endpoints and literal CIDRs. Provider data is re-fetched
//! on every `syncPeriod`.

mod backoff;
mod config;
mod controller;
mod error;
mod policy;
mod reconciler;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting BotNetworkPolicy Controller");

    let config = OperatorConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Default sync period: {:?}", config.default_sync_period);
    info!("  HTTP timeout: {:?}", config.http_timeout);
    for (provider, endpoint) in [
        ("google", &config.google_endpoint),
        ("aws", &config.aws_endpoint),
        ("github", &config.github_endpoint),
    ] {
        if let Some(endpoint) = endpoint {
            info!("  {} endpoint override: {}", provider, endpoint);
        }
    }

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
