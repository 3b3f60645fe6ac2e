//! Generic JSON REST endpoints

use super::get_body;
use crate::error::ProviderError;
use crate::json_path::{JsonFilter, interpret_cidrs, navigate_field};
use crate::reader_trait::ClusterReader;
use crate::sanitize::sanitize;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::Arc;

/// Request header whose value lives in a Secret of the policy namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretHeaderRef {
    /// Header name
    pub header: String,
    pub secret_name: String,
    /// Secret data key holding the header value
    pub key: String,
}

/// GETs an arbitrary JSON document and extracts CIDRs at a field path
#[derive(Debug, Clone)]
pub struct JsonEndpointProvider {
    client: Client,
    reader: Option<Arc<dyn ClusterReader>>,
    namespace: String,
    url: String,
    field_path: String,
    headers: Vec<(String, String)>,
    secret_headers: Vec<SecretHeaderRef>,
    filter: Option<JsonFilter>,
}

impl JsonEndpointProvider {
    /// Provider for `url`, reading CIDRs at `field_path`. `namespace` scopes secret lookups.
    pub fn new(client: Client, namespace: impl Into<String>, url: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            client,
            reader: None,
            namespace: namespace.into(),
            url: url.into(),
            field_path: field_path.into(),
            headers: Vec::new(),
            secret_headers: Vec::new(),
            filter: None,
        }
    }

    /// Cluster access used to resolve secret-backed headers
    pub fn with_reader(mut self, reader: Option<Arc<dyn ClusterReader>>) -> Self {
        self.reader = reader;
        self
    }

    /// Adds a static request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a header whose value is read from a Secret on every fetch
    pub fn with_secret_header(mut self, header: SecretHeaderRef) -> Self {
        self.secret_headers.push(header);
        self
    }

    /// Keeps only array elements matching `filter`
    pub fn with_filter(mut self, filter: Option<JsonFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolves headers, GETs the document and extracts sanitized CIDRs
    pub async fn fetch(&self) -> Result<Vec<String>, ProviderError> {
        let headers = self.resolve_headers().await?;
        let body = get_body(self.client.get(&self.url).headers(headers), &self.url).await?;

        let payload: Value = serde_json::from_str(&body)?;
        let value = navigate_field(&payload, &self.field_path)?;
        let cidrs = interpret_cidrs(value, self.filter.as_ref())?;
        sanitize(cidrs)
    }

    async fn resolve_headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            append_header(&mut headers, name, value)?;
        }
        for secret_header in &self.secret_headers {
            let value = self.resolve_secret_header(secret_header).await?;
            append_header(&mut headers, &secret_header.header, &value)?;
        }
        Ok(headers)
    }

    async fn resolve_secret_header(&self, header: &SecretHeaderRef) -> Result<String, ProviderError> {
        let reader = self
            .reader
            .as_ref()
            .ok_or(ProviderError::ClusterReaderUnavailable("secret-backed headers"))?;

        let secret_key = format!("{}/{}", self.namespace, header.secret_name);
        let secret = reader
            .get_secret(&self.namespace, &header.secret_name)
            .await
            .map_err(|e| ProviderError::SecretFetch {
                secret: secret_key.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ProviderError::SecretFetch {
                secret: secret_key.clone(),
                reason: "not found".to_string(),
            })?;

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&header.key))
            .ok_or_else(|| ProviderError::SecretMissingKey {
                secret: secret_key.clone(),
                key: header.key.clone(),
            })?;
        let value = String::from_utf8(bytes.0.clone())
            .map_err(|_| ProviderError::InvalidHeader(header.header.clone()))?;
        // Secrets created from files usually carry a trailing newline.
        Ok(value.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ProviderError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| ProviderError::InvalidHeader(name.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| ProviderError::InvalidHeader(name.to_string()))?;
    headers.append(header_name, header_value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockClusterReader;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_ref() -> SecretHeaderRef {
        SecretHeaderRef {
            header: "Authorization".to_string(),
            secret_name: "api-token".to_string(),
            key: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_with_static_and_secret_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ranges"))
            .and(header("X-Tenant", "bots"))
            .and(header("Authorization", "Bearer s3cr3t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"items": [
                    {"cidr": "10.0.0.0/8", "kind": "crawler"},
                    {"cidr": "10.1.0.0/16", "kind": "mail"},
                    "172.16.0.0/12"
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reader = MockClusterReader::new();
        reader.add_secret("default", "api-token", &[("token", "Bearer s3cr3t\n")]);

        let filter = JsonFilter::from_spec(&crds::JsonFilterSpec {
            field_conditions: vec![crds::FieldCondition {
                field: "kind".to_string(),
                values: vec!["Crawler".to_string()],
            }],
        });
        let provider = JsonEndpointProvider::new(Client::new(), "default", format!("{}/ranges", server.uri()), "data.items")
            .with_reader(Some(Arc::new(reader) as Arc<dyn ClusterReader>))
            .with_header("X-Tenant", "bots")
            .with_secret_header(token_ref())
            .with_filter(Some(filter));

        let cidrs = provider.fetch().await.unwrap();
        assert_eq!(cidrs, vec!["10.0.0.0/8", "172.16.0.0/12"]);
    }

    #[tokio::test]
    async fn test_secret_header_without_reader() {
        let provider = JsonEndpointProvider::new(Client::new(), "default", "http://127.0.0.1:1/ranges", "")
            .with_secret_header(token_ref());
        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "kube client not configured for secret-backed headers");
    }

    #[tokio::test]
    async fn test_secret_missing_or_incomplete() {
        let reader = Arc::new(MockClusterReader::new());
        let provider = JsonEndpointProvider::new(Client::new(), "team-a", "http://127.0.0.1:1/ranges", "")
            .with_reader(Some(reader.clone() as Arc<dyn ClusterReader>))
            .with_secret_header(token_ref());

        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "fetching secret team-a/api-token: not found");

        reader.add_secret("team-a", "api-token", &[("other", "x")]);
        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "secret team-a/api-token missing key token");
    }

    #[tokio::test]
    async fn test_fetch_bare_string_at_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(" 203.0.113.0/24 ")))
            .mount(&server)
            .await;

        let provider = JsonEndpointProvider::new(Client::new(), "default", server.uri(), "");
        assert_eq!(provider.fetch().await.unwrap(), vec!["203.0.113.0/24"]);
    }

    #[tokio::test]
    async fn test_fetch_unsupported_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 3})))
            .mount(&server)
            .await;

        let provider = JsonEndpointProvider::new(Client::new(), "default", server.uri(), "count");
        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "unsupported JSON field type number");
    }
}
