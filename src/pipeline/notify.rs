use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::NotificationConfig;
use crate::errors::ReconError;

/// Payload sent when a scan reaches `completed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    pub tenant_id: String,
    pub scan_type: String,
    pub scan_result_id: String,
}

#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(&self, notice: &CompletionNotice) -> Result<(), ReconError>;
}

pub struct LogNotifier;

#[async_trait]
impl CompletionNotifier for LogNotifier {
    async fn notify(&self, notice: &CompletionNotice) -> Result<(), ReconError> {
        info!(
            tenant_id = %notice.tenant_id,
            scan_type = %notice.scan_type,
            scan_result_id = %notice.scan_result_id,
            "Scan completed"
        );
        Ok(())
    }
}

/// POSTs the notice as JSON to a fixed URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, ReconError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ReconError::Notification(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl CompletionNotifier for WebhookNotifier {
    async fn notify(&self, notice: &CompletionNotice) -> Result<(), ReconError> {
        let resp = self
            .client
            .post(&self.url)
            .json(notice)
            .send()
            .await
            .map_err(|e| ReconError::Notification(format!("Webhook request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(ReconError::Notification(format!("Webhook returned {}", resp.status())));
        }
        Ok(())
    }
}

pub fn from_config(config: &NotificationConfig) -> Result<Arc<dyn CompletionNotifier>, ReconError> {
    match config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
