use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::cache::{IntelCache, NoopCache};
use super::merge::{merge_all, merge_into};
use super::provider::IntelligenceProvider;
use crate::errors::{with_retry, ProviderError, RetryPolicy};
use crate::models::IntelligenceData;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Combines external providers, a local fallback and an optional cache into
/// one best-effort [`IntelligenceData`] per domain.
pub struct IntelligenceOrchestrator {
    providers: Vec<Arc<dyn IntelligenceProvider>>,
    fallback: Arc<dyn IntelligenceProvider>,
    cache: Arc<dyn IntelCache>,
    retry: RetryPolicy,
    ttl: Duration,
}

/// How much of the picture the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntelScope {
    /// Host and subdomain data, gaps filled by the local fallback.
    Full,
    /// Subdomain names only. The fallback port sweep is skipped and nothing is cached.
    Subdomains,
}

/// Why the local fallback ran, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoProviderSucceeded,
    AllQuotaExceeded,
    NoPortData,
}

impl IntelligenceOrchestrator {
    pub fn new(providers: Vec<Arc<dyn IntelligenceProvider>>, fallback: Arc<dyn IntelligenceProvider>) -> Self {
        Self {
            providers,
            fallback,
            cache: Arc::new(NoopCache),
            retry: RetryPolicy::default(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn IntelCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Never fails. Provider, cache and fallback errors are logged and absorbed.
    pub async fn gather(&self, domain: &str) -> IntelligenceData {
        self.gather_scoped(domain, IntelScope::Full).await
    }

    pub async fn gather_scoped(&self, domain: &str, scope: IntelScope) -> IntelligenceData {
        match self.cache.get(domain).await {
            Ok(Some(cached)) => {
                debug!(domain, "Intelligence cache hit");
                return cached;
            }
            Ok(None) => {}
            Err(e) => warn!(domain, error = %e, "Intelligence cache unavailable, treating as miss"),
        }

        let outcomes = join_all(self.providers.iter().map(|provider| async move {
            let result = with_retry(provider.name(), &self.retry, || provider.fetch(domain)).await;
            (provider.name().to_string(), result)
        }))
        .await;

        let mut successes = Vec::new();
        let mut failures: Vec<ProviderError> = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(data) => {
                    debug!(domain, provider = %name, ports = data.ports.len(), subdomains = data.subdomains.len(), "Provider succeeded");
                    successes.push(data);
                }
                Err(e) if e.is_missing_credentials() => debug!(domain, provider = %name, "Provider disabled"),
                Err(e) => {
                    warn!(domain, provider = %name, error = %e, "Provider failed");
                    failures.push(e);
                }
            }
        }

        let succeeded = successes.len();
        let mut merged = merge_all(successes);

        let mut fallback_ok = false;
        match fallback_reason(succeeded, &failures, &merged) {
            Some(reason) if scope == IntelScope::Full => {
                info!(domain, reason = ?reason, "Running local fallback scan");
                match self.fallback.fetch(domain).await {
                    Ok(local) => {
                        merge_into(&mut merged, local);
                        fallback_ok = true;
                    }
                    Err(e) => warn!(domain, error = %e, "Local fallback failed"),
                }
            }
            Some(reason) => debug!(domain, reason = ?reason, "Subdomain-only gather, skipping local fallback"),
            None => {}
        }

        if worth_caching(scope, succeeded > 0 || fallback_ok, &merged) {
            if let Err(e) = self.cache.set(domain, &merged, self.ttl).await {
                warn!(domain, error = %e, "Intelligence cache write failed");
            }
        } else {
            debug!(domain, scope = ?scope, "Intelligence not cached");
        }

        info!(
            domain,
            providers_ok = succeeded,
            providers_failed = failures.len(),
            ports = merged.ports.len(),
            subdomains = merged.subdomains.len(),
            "Intelligence gathered"
        );
        merged
    }
}

/// Only complete, non-empty results from a source that answered are cached;
/// an outage must not pin an empty snapshot for the whole TTL.
fn worth_caching(scope: IntelScope, sourced: bool, merged: &IntelligenceData) -> bool {
    scope == IntelScope::Full && sourced && !merged.is_empty()
}

/// Disabled providers (missing credentials) are not counted as failures.
fn fallback_reason(succeeded: usize, failures: &[ProviderError], merged: &IntelligenceData) -> Option<FallbackReason> {
    if succeeded == 0 {
        Some(FallbackReason::NoProviderSucceeded)
    } else if !failures.is_empty() && failures.iter().all(ProviderError::is_quota) {
        Some(FallbackReason::AllQuotaExceeded)
    } else if merged.ports.is_empty() {
        Some(FallbackReason::NoPortData)
    } else {
        None
    }
}
