use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::provider::IntelligenceProvider;
use crate::errors::ProviderError;
use crate::models::{IntelligenceData, SubdomainFinding};

const NAME: &str = "securitytrails";

/// Subdomain and certificate intelligence from SecurityTrails.
pub struct SecurityTrailsProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl SecurityTrailsProvider {
    pub fn new(api_key: Option<String>, base_url: Option<&str>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            api_key,
            base_url: base_url.unwrap_or("https://api.securitytrails.com").trim_end_matches('/').to_string(),
        }
    }
}

/// 403 bodies that mean the plan is exhausted rather than the key is bad.
fn is_quota_message(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("quota") || lower.contains("limit") || lower.contains("exceeded")
}

#[async_trait]
impl IntelligenceProvider for SecurityTrailsProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<IntelligenceData, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::missing(NAME))?;

        let resp = self
            .client
            .get(format!("{}/v1/domain/{}/subdomains", self.base_url, domain))
            .query(&[("children_only", "false")])
            .header("APIKEY", key)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::quota(NAME, "rate limit exceeded"));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status == StatusCode::FORBIDDEN && is_quota_message(&body) {
                return Err(ProviderError::quota(NAME, body));
            }
            return Err(ProviderError::transient(NAME, format!("HTTP {}", status)));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("invalid response: {}", e)))?;

        // Historical names: unverified until the coordinator resolves them
        let subdomains: Vec<SubdomainFinding> = data["subdomains"]
            .as_array()
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|label| !label.is_empty())
                    .map(|label| SubdomainFinding::inactive(&format!("{}.{}", label.to_lowercase(), domain)))
                    .collect()
            })
            .unwrap_or_default();

        debug!(domain, count = subdomains.len(), "SecurityTrails subdomains");

        let mut result = IntelligenceData { subdomains, ..Default::default() };
        if let Some(count) = data["subdomain_count"].as_u64() {
            result.extra.insert("securitytrails.subdomainCount".into(), json!(count));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubdomainStatus;
    use crate::test_support::{route, serve};

    fn provider(base: &str, key: Option<&str>) -> SecurityTrailsProvider {
        SecurityTrailsProvider::new(key.map(String::from), Some(base), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_subdomains_are_mapped() {
        let body = r#"{"subdomains":["www","API",""],"subdomain_count":2}"#;
        let (base, seen) = serve(vec![route("/v1/domain/example.com/subdomains", 200, body)]).await;

        let data = provider(&base, Some("st-key")).fetch("example.com").await.unwrap();
        let names: Vec<&str> = data.subdomains.iter().map(|s| s.subdomain.as_str()).collect();
        assert_eq!(names, vec!["www.example.com", "api.example.com"]);
        assert!(data.subdomains.iter().all(|s| s.ip.is_none() && s.status == SubdomainStatus::Inactive));
        assert_eq!(data.extra["securitytrails.subdomainCount"], json!(2));
        assert!(seen.lock().unwrap()[0].to_lowercase().contains("apikey: st-key"));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let err = provider("http://127.0.0.1:9", None).fetch("example.com").await.unwrap_err();
        assert!(err.is_missing_credentials());
    }

    #[tokio::test]
    async fn test_quota_statuses() {
        let (base, _) = serve(vec![route("/", 429, "")]).await;
        assert!(provider(&base, Some("k")).fetch("example.com").await.unwrap_err().is_quota());

        let (base, _) = serve(vec![route("/", 403, r#"{"message":"You've exceeded the usage limits for your account."}"#)]).await;
        assert!(provider(&base, Some("k")).fetch("example.com").await.unwrap_err().is_quota());
    }

    #[tokio::test]
    async fn test_other_errors_are_transient() {
        let (base, _) = serve(vec![route("/", 403, r#"{"message":"Invalid authentication credentials"}"#)]).await;
        let err = provider(&base, Some("k")).fetch("example.com").await.unwrap_err();
        assert!(matches!(err, ProviderError::TransientError { .. }));

        let err = provider("http://127.0.0.1:9", Some("k")).fetch("example.com").await.unwrap_err();
        assert!(matches!(err, ProviderError::TransientError { .. }));
    }
}
