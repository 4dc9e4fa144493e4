use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::Database;
use crate::errors::ReconError;
use crate::models::IntelligenceData;

/// Optional read-through store for orchestrated intelligence, keyed by domain.
/// Absence only costs a re-fetch; errors are never fatal to callers.
#[async_trait]
pub trait IntelCache: Send + Sync {
    async fn get(&self, domain: &str) -> Result<Option<IntelligenceData>, ReconError>;

    async fn set(&self, domain: &str, data: &IntelligenceData, ttl: Duration) -> Result<(), ReconError>;
}

/// Cache that stores nothing.
pub struct NoopCache;

#[async_trait]
impl IntelCache for NoopCache {
    async fn get(&self, _domain: &str) -> Result<Option<IntelligenceData>, ReconError> {
        Ok(None)
    }

    async fn set(&self, _domain: &str, _data: &IntelligenceData, _ttl: Duration) -> Result<(), ReconError> {
        Ok(())
    }
}

/// Process-local cache with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (Instant, IntelligenceData)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntelCache for MemoryCache {
    async fn get(&self, domain: &str) -> Result<Option<IntelligenceData>, ReconError> {
        let hit = self.entries.get(domain).and_then(|entry| {
            let (expires, data) = entry.value();
            (Instant::now() < *expires).then(|| data.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(domain, |_, (expires, _)| Instant::now() >= *expires);
        }
        Ok(hit)
    }

    async fn set(&self, domain: &str, data: &IntelligenceData, ttl: Duration) -> Result<(), ReconError> {
        self.entries.insert(domain.to_string(), (Instant::now() + ttl, data.clone()));
        Ok(())
    }
}

#[async_trait]
impl IntelCache for Database {
    async fn get(&self, domain: &str) -> Result<Option<IntelligenceData>, ReconError> {
        self.cache_get(domain)
    }

    async fn set(&self, domain: &str, data: &IntelligenceData, ttl: Duration) -> Result<(), ReconError> {
        self.cache_put(domain, data, ttl.as_secs() as i64)
    }
}
