use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::IntelligenceData;

/// A source of domain intelligence. External vendors and the local scanner
/// implement the same contract, so the orchestrator treats them alike.
#[async_trait]
pub trait IntelligenceProvider: Send + Sync {
    /// Provider name for logging and merge ordering.
    fn name(&self) -> &str;

    async fn fetch(&self, domain: &str) -> Result<IntelligenceData, ProviderError>;
}
