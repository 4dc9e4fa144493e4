use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{severity_for, BreachLookup};
use crate::errors::ReconError;
use crate::models::{BreachRecord, BreachSource};

const HIBP_BASE_URL: &str = "https://haveibeenpwned.com/api/v3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HibpBreach {
    name: String,
    #[serde(default)]
    breach_date: String,
    #[serde(default)]
    data_classes: Vec<String>,
}

/// Have I Been Pwned `breachedaccount` client.
pub struct HibpClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl HibpClient {
    pub fn new(api_key: Option<String>) -> Result<Self, ReconError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("reconlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReconError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self { http, api_key, base_url: HIBP_BASE_URL.to_string() })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch(&self, email: &str) -> Result<Vec<BreachRecord>, ReconError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ReconError::MissingCredentials("breach API key not configured".into()))?;

        // Pushed as a path segment so `?`, `#` and `/` in a local part stay inside it
        let mut url = Url::parse(&format!("{}/breachedaccount", self.base_url))
            .map_err(|e| ReconError::Config(format!("Invalid breach API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ReconError::Config("Breach API URL cannot take a path".into()))?
            .push(email);

        let resp = self
            .http
            .get(url)
            .query(&[("truncateResponse", "false")])
            .header("hibp-api-key", key)
            .send()
            .await
            .map_err(|e| ReconError::Transient(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::TOO_MANY_REQUESTS => Err(ReconError::QuotaExceeded("breach API rate limited".into())),
            status if status.is_success() => {
                let breaches: Vec<HibpBreach> = resp
                    .json()
                    .await
                    .map_err(|e| ReconError::Parse(format!("breach response: {}", e)))?;
                Ok(breaches
                    .into_iter()
                    .map(|b| BreachRecord {
                        email: email.to_string(),
                        severity: severity_for(&b.data_classes),
                        breach_name: b.name,
                        breach_date: b.breach_date,
                        data_classes: b.data_classes,
                        source: BreachSource::Hibp,
                    })
                    .collect())
            }
            status => Err(ReconError::Transient(format!("breach API returned {}", status))),
        }
    }
}

#[async_trait]
impl BreachLookup for HibpClient {
    async fn lookup(&self, email: &str) -> Vec<BreachRecord> {
        match self.fetch(email).await {
            Ok(records) => {
                debug!(email, breaches = records.len(), "Breach lookup finished");
                records
            }
            Err(e) => {
                warn!(email, error = %e, "Breach lookup failed, treating as no breaches");
                Vec::new()
            }
        }
    }

    fn source(&self) -> BreachSource {
        BreachSource::Hibp
    }
}
