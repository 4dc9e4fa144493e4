use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::credentials::resolve_credential;
use crate::errors::RetryPolicy;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReconConfig {
    pub providers: ProvidersConfig,
    pub breach: BreachConfig,
    pub scan: ScanConfig,
    pub worker: WorkerConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub database: DatabaseConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Subdomain / certificate intelligence (SecurityTrails).
    pub certificate: ProviderConfig,
    /// Host / port intelligence (Shodan).
    pub host: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// API key with `$VAR` references resolved; `None` when unset or empty.
    pub fn resolved_key(&self) -> Option<String> {
        self.api_key.as_deref().and_then(resolve_credential)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BreachMode {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreachConfig {
    pub mode: BreachMode,
    pub api_key: Option<String>,
    pub dataset_path: Option<String>,
}

impl BreachConfig {
    pub fn resolved_key(&self) -> Option<String> {
        self.api_key.as_deref().and_then(resolve_credential)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub port_timeout_secs: u64,
    pub tls_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub dns_timeout_secs: u64,
    pub provider_timeout_secs: u64,
    pub subdomain_wordlist_limit: usize,
    pub subdomain_resolution_limit: usize,
    pub directory_wordlist_limit: usize,
    pub directory_batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port_timeout_secs: 3,
            tls_timeout_secs: 10,
            http_timeout_secs: 5,
            dns_timeout_secs: 5,
            provider_timeout_secs: 15,
            subdomain_wordlist_limit: 200,
            subdomain_resolution_limit: 200,
            directory_wordlist_limit: 100,
            directory_batch_size: 10,
        }
    }
}

impl ScanConfig {
    pub fn port_timeout(&self) -> Duration {
        Duration::from_secs(self.port_timeout_secs)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub poll_interval_ms: u64,
    /// Deliveries per job before the queue gives up on it.
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            poll_interval_ms: 1000,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 24 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data/reconlens.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
}
