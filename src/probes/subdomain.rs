use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::wordlists::SUBDOMAIN_PREFIXES;
use super::SubdomainDiscovery;
use crate::config::ScanConfig;
use crate::errors::ReconError;
use crate::models::SubdomainFinding;

const CT_BASE_URL: &str = "https://crt.sh";

#[derive(Debug, Deserialize)]
struct CertTransparencyEntry {
    name_value: String,
}

/// Passive (certificate transparency) plus wordlist subdomain discovery.
pub struct SubdomainResolver {
    http: reqwest::Client,
    resolver: TokioAsyncResolver,
    ct_base_url: String,
    wordlist_limit: usize,
    resolution_limit: usize,
    dns_timeout: Duration,
}

impl SubdomainResolver {
    pub fn new(config: &ScanConfig) -> Result<Self, ReconError> {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout())
            .user_agent(concat!("reconlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReconError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
            ct_base_url: CT_BASE_URL.to_string(),
            wordlist_limit: config.subdomain_wordlist_limit,
            resolution_limit: config.subdomain_resolution_limit,
            dns_timeout: config.dns_timeout(),
        })
    }

    pub fn with_ct_base_url(mut self, url: &str) -> Self {
        self.ct_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Names seen in certificate transparency logs. Empty on any failure.
    pub async fn passive_candidates(&self, domain: &str) -> Vec<String> {
        let url = format!("{}/?q=%.{}&output=json", self.ct_base_url, domain);
        let entries = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp.json::<Vec<CertTransparencyEntry>>().await,
            Ok(resp) => {
                warn!(domain, status = %resp.status(), "Certificate transparency query rejected");
                return Vec::new();
            }
            Err(e) => {
                warn!(domain, error = %e, "Certificate transparency query failed");
                return Vec::new();
            }
        };

        match entries {
            Ok(entries) => ct_names(&entries, domain),
            Err(e) => {
                warn!(domain, error = %e, "Unparseable certificate transparency response");
                Vec::new()
            }
        }
    }

    pub fn active_candidates(&self, domain: &str) -> Vec<String> {
        SUBDOMAIN_PREFIXES
            .iter()
            .take(self.wordlist_limit)
            .map(|prefix| format!("{}.{}", prefix, domain))
            .collect()
    }

    /// Resolve one name's IPv4 address; any failure marks it inactive.
    pub async fn resolve(&self, name: &str) -> SubdomainFinding {
        let fqdn = format!("{}.", name);
        match tokio::time::timeout(self.dns_timeout, self.resolver.ipv4_lookup(fqdn.as_str())).await {
            Ok(Ok(lookup)) => match lookup.iter().next() {
                Some(a) => SubdomainFinding::active(name, a.0.to_string()),
                None => SubdomainFinding::inactive(name),
            },
            Ok(Err(e)) => {
                debug!(name, error = %e, "Resolution failed");
                SubdomainFinding::inactive(name)
            }
            Err(_) => {
                debug!(name, "Resolution timed out");
                SubdomainFinding::inactive(name)
            }
        }
    }

    /// Resolve `names` concurrently, de-duplicated and capped at the resolution limit.
    pub async fn resolve_all(&self, names: &[String]) -> Vec<SubdomainFinding> {
        let candidates = union_candidates(names.to_vec(), Vec::new(), self.resolution_limit);
        join_all(candidates.iter().map(|name| self.resolve(name))).await
    }

    pub async fn discover(&self, domain: &str) -> Vec<SubdomainFinding> {
        let passive = self.passive_candidates(domain).await;
        let passive_count = passive.len();
        let candidates = union_candidates(passive, self.active_candidates(domain), self.resolution_limit);

        let findings = self.resolve_all(&candidates).await;
        let active = findings.iter().filter(|f| f.ip.is_some()).count();
        info!(domain, passive = passive_count, attempted = findings.len(), active, "Subdomain discovery finished");
        findings
    }
}

/// Certificate names belonging to `domain`, wildcards stripped.
fn ct_names(entries: &[CertTransparencyEntry], domain: &str) -> Vec<String> {
    let suffix = format!(".{}", domain);
    entries
        .iter()
        .flat_map(|entry| entry.name_value.lines())
        .map(|name| name.trim().to_lowercase())
        .map(|name| name.trim_start_matches("*.").to_string())
        .filter(|name| !name.contains('*') && (name == domain || name.ends_with(&suffix)))
        .collect()
}

/// Case-insensitive union, passive names first, capped at `limit`.
fn union_candidates(passive: Vec<String>, active: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    passive
        .into_iter()
        .chain(active)
        .map(|name| name.to_lowercase())
        .filter(|name| seen.insert(name.clone()))
        .take(limit)
        .collect()
}

#[async_trait]
impl SubdomainDiscovery for SubdomainResolver {
    async fn discover_subdomains(&self, domain: &str) -> Vec<SubdomainFinding> {
        self.discover(domain).await
    }

    async fn resolve_names(&self, names: &[String]) -> Vec<SubdomainFinding> {
        self.resolve_all(names).await
    }
}
