use std::sync::Arc;

use async_trait::async_trait;

use super::provider::IntelligenceProvider;
use crate::errors::ProviderError;
use crate::models::IntelligenceData;
use crate::probes::{PortProbe, SubdomainDiscovery};

/// Active local scanning exposed as an intelligence provider.
pub struct LocalFallbackProvider {
    ports: Arc<dyn PortProbe>,
    subdomains: Arc<dyn SubdomainDiscovery>,
}

impl LocalFallbackProvider {
    pub fn new(ports: Arc<dyn PortProbe>, subdomains: Arc<dyn SubdomainDiscovery>) -> Self {
        Self { ports, subdomains }
    }
}

#[async_trait]
impl IntelligenceProvider for LocalFallbackProvider {
    fn name(&self) -> &str {
        "local-scan"
    }

    async fn fetch(&self, domain: &str) -> Result<IntelligenceData, ProviderError> {
        let (ports, subdomains) = tokio::join!(
            self.ports.scan_ports(domain),
            self.subdomains.discover_subdomains(domain)
        );
        Ok(IntelligenceData { ports, subdomains, ..Default::default() })
    }
}
