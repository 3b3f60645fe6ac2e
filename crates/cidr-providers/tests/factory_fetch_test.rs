//! Providers built by the factory against local HTTP endpoints

use cidr_providers::{ProviderError, ProviderFactory};
use crds::{AwsProviderSpec, GitHubProviderSpec, JsonEndpointProviderSpec, ProviderSpec};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn named(name: &str) -> ProviderSpec {
    ProviderSpec {
        name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_configured_default_endpoints() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/goog.json",
        json!({"prefixes": [{"ipv4Prefix": "34.64.0.0/10", "scope": "us-east1"}]}),
    )
    .await;
    mount_json(
        &server,
        "/ip-ranges.json",
        json!({"prefixes": [{"ip_prefix": "3.0.0.0/15", "service": "EC2", "region": "ap-northeast-1"}]}),
    )
    .await;
    mount_json(&server, "/meta", json!({"hooks": ["192.30.252.0/22"]})).await;

    let factory = ProviderFactory::new(reqwest::Client::new(), None)
        .with_google_endpoint(Some(&format!("{}/goog.json", server.uri())))
        .with_aws_endpoint(Some(&format!("{}/ip-ranges.json", server.uri())))
        .with_github_endpoint(Some(&format!("{}/meta", server.uri())));

    let google = factory.from_spec("default", &named("google")).unwrap();
    assert_eq!(google.fetch().await.unwrap(), vec!["34.64.0.0/10"]);

    let aws = factory.from_spec("default", &named("aws")).unwrap();
    assert_eq!(aws.fetch().await.unwrap(), vec!["3.0.0.0/15"]);

    let github = factory.from_spec("default", &named("github")).unwrap();
    assert_eq!(github.fetch().await.unwrap(), vec!["192.30.252.0/22"]);
}

#[tokio::test]
async fn test_aws_block_applies_default_filters() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/ip-ranges.json",
        json!({"prefixes": [
            {"ip_prefix": "3.0.0.0/15", "service": "EC2", "region": "us-east-1"},
            {"ip_prefix": "52.94.0.0/22", "service": "AMAZON", "region": "us-east-1"}
        ]}),
    )
    .await;

    let spec = ProviderSpec {
        aws: Some(AwsProviderSpec {
            url: Some(format!("{}/ip-ranges.json", server.uri())),
            ..Default::default()
        }),
        ..named("aws")
    };
    let provider = ProviderFactory::new(reqwest::Client::new(), None)
        .from_spec("default", &spec)
        .unwrap();
    assert_eq!(provider.fetch().await.unwrap(), vec!["52.94.0.0/22"]);
}

#[tokio::test]
async fn test_github_missing_roles_error() {
    let server = MockServer::start().await;
    mount_json(&server, "/meta", json!({"hooks": ["192.30.252.0/22"]})).await;

    let spec = ProviderSpec {
        github: Some(GitHubProviderSpec {
            url: Some(format!("{}/meta", server.uri())),
            roles: vec!["actions".to_string()],
        }),
        ..named("github")
    };
    let provider = ProviderFactory::new(reqwest::Client::new(), None)
        .from_spec("default", &spec)
        .unwrap();
    let err = provider.fetch().await.unwrap_err();
    assert_eq!(err.to_string(), "no CIDRs found for roles: actions");
}

#[tokio::test]
async fn test_json_endpoint_static_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ranges"))
        .and(header("X-Api-Key", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"cidrs": ["198.51.100.0/24"]}})))
        .expect(1)
        .mount(&server)
        .await;

    let spec = ProviderSpec {
        json_endpoint: Some(JsonEndpointProviderSpec {
            url: format!("{}/v1/ranges", server.uri()),
            field_path: "result.cidrs".to_string(),
            headers: BTreeMap::from([("X-Api-Key".to_string(), "abc".to_string())]),
            ..Default::default()
        }),
        ..named("jsonendpoint")
    };
    let provider = ProviderFactory::new(reqwest::Client::new(), None)
        .from_spec("default", &spec)
        .unwrap();
    assert_eq!(provider.fetch().await.unwrap(), vec!["198.51.100.0/24"]);
}

#[tokio::test]
async fn test_fetch_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/meta"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"hooks": ["192.30.252.0/22"]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let factory = ProviderFactory::new(reqwest::Client::new(), None)
        .with_github_endpoint(Some(&format!("{}/meta", server.uri())));
    let provider = factory.from_spec("default", &named("github")).unwrap();

    let err = provider
        .fetch_with_timeout(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)));
}
