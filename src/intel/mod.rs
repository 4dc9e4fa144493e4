pub mod cache;
pub mod fallback;
pub mod merge;
pub mod orchestrator;
pub mod provider;
pub mod securitytrails;
pub mod shodan;

use std::sync::Arc;

use crate::config::ReconConfig;

pub use cache::{IntelCache, MemoryCache, NoopCache};
pub use fallback::LocalFallbackProvider;
pub use orchestrator::{IntelScope, IntelligenceOrchestrator};
pub use provider::IntelligenceProvider;
pub use securitytrails::SecurityTrailsProvider;
pub use shodan::ShodanProvider;

/// External providers in merge order. Providers without a key are still
/// registered and report `MissingCredentials`.
pub fn providers_from_config(config: &ReconConfig) -> Vec<Arc<dyn IntelligenceProvider>> {
    let timeout = config.scan.provider_timeout();
    vec![
        Arc::new(ShodanProvider::new(
            config.providers.host.resolved_key(),
            config.providers.host.base_url.as_deref(),
            timeout,
        )),
        Arc::new(SecurityTrailsProvider::new(
            config.providers.certificate.resolved_key(),
            config.providers.certificate.base_url.as_deref(),
            timeout,
        )),
    ]
}
