use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{redirect, StatusCode};
use tracing::{debug, info};

use super::wordlists::DIRECTORY_PATHS;
use super::PathDiscovery;
use crate::config::ScanConfig;
use crate::errors::ReconError;
use crate::models::DiscoveredPath;

/// Batched HTTP path discovery against `https://{domain}`.
pub struct DirectoryProber {
    http: reqwest::Client,
    paths: Vec<String>,
    batch_size: usize,
    base_url: Option<String>,
}

impl DirectoryProber {
    pub fn new(config: &ScanConfig) -> Result<Self, ReconError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .redirect(redirect::Policy::limited(2))
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("reconlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReconError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            paths: DIRECTORY_PATHS
                .iter()
                .take(config.directory_wordlist_limit)
                .map(|p| p.to_string())
                .collect(),
            batch_size: config.directory_batch_size.max(1),
            base_url: None,
        })
    }

    /// Scan a fixed origin instead of `https://{domain}`.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }

    pub async fn probe(&self, domain: &str) -> Vec<DiscoveredPath> {
        let base = self.base_url.clone().unwrap_or_else(|| format!("https://{}", domain));
        let mut hits = Vec::new();

        for batch in self.paths.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|path| self.probe_path(&base, path))).await;
            hits.extend(results.into_iter().flatten());
        }

        info!(domain, probed = self.paths.len(), hits = hits.len(), "Directory probing finished");
        hits
    }

    async fn probe_path(&self, base: &str, path: &str) -> Option<DiscoveredPath> {
        let url = format!("{}/{}", base, path.trim_start_matches('/'));
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => Some(DiscoveredPath {
                path: format!("/{}", path.trim_start_matches('/')),
                status: resp.status().as_u16(),
                kind: classify_path(path).to_string(),
            }),
            Ok(_) => None,
            Err(e) => {
                debug!(url = %url, error = %e, "Path probe failed");
                None
            }
        }
    }
}

/// Coarse label for a discovered path.
pub fn classify_path(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    let sensitive = [".git", ".env", ".svn", ".ht", "config", "backup", ".sql", ".zip", ".tar", ".bak", "dump", ".log"];
    if sensitive.iter().any(|s| lower.contains(s)) {
        "sensitive-file"
    } else if ["admin", "cpanel", "phpmyadmin", "manager", "console", "dashboard", "panel"]
        .iter()
        .any(|s| lower.contains(s))
    {
        "admin-panel"
    } else if ["api", "graphql", "swagger", "openapi", "actuator"].iter().any(|s| lower.contains(s)) {
        "api"
    } else if ["login", "signin", "auth", "register", "signup", "account"].iter().any(|s| lower.contains(s)) {
        "auth"
    } else if lower.rsplit('/').next().is_some_and(|last| last.contains('.')) {
        "file"
    } else {
        "directory"
    }
}

#[async_trait]
impl PathDiscovery for DirectoryProber {
    async fn discover_paths(&self, domain: &str) -> Vec<DiscoveredPath> {
        self.probe(domain).await
    }
}
