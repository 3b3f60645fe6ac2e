//! Built-in cloud IP range feeds

use super::get_body;
use crate::error::ProviderError;
use crate::sanitize::sanitize;
use crate::selector::Selector;
use reqwest::Client;
use serde_json::{Map, Value};

/// GETs a JSON object from a fixed URL and hands it to a [`Selector`]
#[derive(Debug, Clone)]
pub struct StaticHttpProvider {
    client: Client,
    url: String,
    selector: Selector,
}

impl StaticHttpProvider {
    /// Provider for the feed at `url`
    pub fn new(client: Client, url: impl Into<String>, selector: Selector) -> Self {
        Self {
            client,
            url: url.into(),
            selector,
        }
    }

    /// Feed URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Extraction strategy applied to the feed
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// GETs the feed and returns the selected, sanitized CIDRs
    pub async fn fetch(&self) -> Result<Vec<String>, ProviderError> {
        let body = get_body(self.client.get(&self.url), &self.url).await?;
        let payload: Map<String, Value> = serde_json::from_str(&body)?;
        let cidrs = self.selector.select(&payload)?;
        sanitize(cidrs)
    }
}
