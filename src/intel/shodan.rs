use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::provider::IntelligenceProvider;
use crate::errors::ProviderError;
use crate::models::{IntelligenceData, PortFinding, Severity, VulnerabilityRecord};
use crate::utils::truncation::banner_line;

const NAME: &str = "shodan";

/// Host and port intelligence from Shodan.
pub struct ShodanProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl ShodanProvider {
    pub fn new(api_key: Option<String>, base_url: Option<&str>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            api_key,
            base_url: base_url.unwrap_or("https://api.shodan.io").trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, ProviderError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("request failed: {}", e)))?;

        match resp.status() {
            StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
                Err(ProviderError::quota(NAME, format!("HTTP {}", resp.status())))
            }
            _ => Ok(resp),
        }
    }

    async fn resolve(&self, domain: &str, key: &str) -> Result<Option<String>, ProviderError> {
        let resp = self.get("/dns/resolve", &[("hostnames", domain), ("key", key)]).await?;
        if !resp.status().is_success() {
            return Err(ProviderError::transient(NAME, format!("resolve HTTP {}", resp.status())));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("invalid resolve response: {}", e)))?;
        Ok(body[domain].as_str().map(String::from))
    }
}

fn severity_from_cvss(cvss: Option<f64>) -> Severity {
    match cvss {
        Some(score) if score >= 9.0 => Severity::Critical,
        Some(score) if score >= 7.0 => Severity::High,
        Some(score) if score >= 4.0 => Severity::Medium,
        Some(_) => Severity::Low,
        None => Severity::Medium,
    }
}

fn parse_ports(host: &Value) -> Vec<PortFinding> {
    let Some(services) = host["data"].as_array() else {
        return Vec::new();
    };
    services
        .iter()
        .filter_map(|svc| {
            let port = u16::try_from(svc["port"].as_u64()?).ok()?;
            let service = svc["_shodan"]["module"].as_str().unwrap_or("unknown");
            let mut finding = PortFinding::open(port, service);
            finding.product = svc["product"].as_str().map(String::from);
            finding.version = svc["version"].as_str().map(String::from);
            finding.banner = svc["data"].as_str().and_then(|d| banner_line(d.as_bytes()));
            Some(finding)
        })
        .collect()
}

/// Top-level `vulns` ids, enriched with CVSS and summary from per-service entries.
fn parse_vulns(host: &Value, ip: &str) -> Vec<VulnerabilityRecord> {
    let Some(ids) = host["vulns"].as_array() else {
        return Vec::new();
    };
    let services = host["data"].as_array().cloned().unwrap_or_default();

    ids.iter()
        .filter_map(Value::as_str)
        .map(|id| {
            let detail = services.iter().map(|svc| &svc["vulns"][id]).find(|v| v.is_object());
            let cvss = detail.and_then(|d| d["cvss"].as_f64().or_else(|| d["cvss"].as_str()?.parse().ok()));
            let summary = detail
                .and_then(|d| d["summary"].as_str())
                .unwrap_or("Known vulnerability reported for this host");
            VulnerabilityRecord {
                id: id.to_string(),
                title: format!("{} on {}", id, ip),
                description: summary.to_string(),
                severity: severity_from_cvss(cvss),
                affected_asset: ip.to_string(),
            }
        })
        .collect()
}

#[async_trait]
impl IntelligenceProvider for ShodanProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<IntelligenceData, ProviderError> {
        let key = self.api_key.as_deref().ok_or_else(|| ProviderError::missing(NAME))?;

        let Some(ip) = self.resolve(domain, key).await? else {
            debug!(domain, "Host intelligence has no address for domain");
            return Ok(IntelligenceData::default());
        };

        let resp = self.get(&format!("/shodan/host/{}", ip), &[("key", key)]).await?;
        let mut result = IntelligenceData::default();
        result.extra.insert("shodan.ip".into(), json!(ip));

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(result);
        }
        if !resp.status().is_success() {
            return Err(ProviderError::transient(NAME, format!("host HTTP {}", resp.status())));
        }

        let host: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::transient(NAME, format!("invalid host response: {}", e)))?;

        result.ports = parse_ports(&host);
        let vulns = parse_vulns(&host, &ip);
        if !vulns.is_empty() {
            result.vulnerabilities = Some(vulns);
        }
        for field in ["org", "isp", "os", "asn"] {
            if let Some(v) = host.get(field).filter(|v| !v.is_null()) {
                result.extra.insert(format!("shodan.{}", field), v.clone());
            }
        }

        debug!(domain, ip = %ip, ports = result.ports.len(), "Shodan host data");
        Ok(result)
    }
}
