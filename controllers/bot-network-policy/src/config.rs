//! Operator configuration from environment variables.

use crate::error::ControllerError;
use crds::parse_duration;
use std::env;
use std::time::Duration;

/// Re-sync interval for resources without `syncPeriod`
pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Per-request timeout for provider HTTP calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    pub google_endpoint: Option<String>,
    pub aws_endpoint: Option<String>,
    pub github_endpoint: Option<String>,
    pub default_sync_period: Duration,
    pub http_timeout: Duration,
    /// Event reporter instance
    pub pod_name: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            google_endpoint: None,
            aws_endpoint: None,
            github_endpoint: None,
            default_sync_period: DEFAULT_SYNC_PERIOD,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            pod_name: None,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let default_sync_period = match get("DEFAULT_SYNC_PERIOD") {
            Some(raw) => {
                let period = parse_duration(&raw).map_err(|e| {
                    ControllerError::InvalidConfig(format!("DEFAULT_SYNC_PERIOD {:?}: {}", raw, e))
                })?;
                if period.is_zero() {
                    return Err(ControllerError::InvalidConfig(
                        "DEFAULT_SYNC_PERIOD must be greater than zero".to_string(),
                    ));
                }
                period
            }
            None => DEFAULT_SYNC_PERIOD,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "HTTP_TIMEOUT_SECS must be a positive integer, got {:?}",
                        raw
                    )));
                }
            },
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            namespace: get("WATCH_NAMESPACE"),
            google_endpoint: get("GOOGLE_IP_RANGES_URL"),
            aws_endpoint: get("AWS_IP_RANGES_URL"),
            github_endpoint: get("GITHUB_META_URL"),
            default_sync_period,
            http_timeout,
            pod_name: get("POD_NAME"),
        })
    }
}
