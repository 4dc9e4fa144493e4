use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{severity_for, BreachLookup};
use crate::errors::ReconError;
use crate::models::{BreachRecord, BreachSource};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetEntry {
    name: String,
    #[serde(default)]
    breach_date: String,
    #[serde(default)]
    data_classes: Vec<String>,
}

/// Breach data preloaded from a JSON file of `{ "email": [ {name, breachDate, dataClasses} ] }`.
pub struct LocalDataset {
    entries: HashMap<String, Vec<DatasetEntry>>,
}

impl LocalDataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReconError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Config(format!("Cannot read breach dataset {}: {}", path.display(), e)))?;
        let dataset = Self::from_json(&content)?;
        info!(path = %path.display(), emails = dataset.entries.len(), "Loaded local breach dataset");
        Ok(dataset)
    }

    pub fn from_json(content: &str) -> Result<Self, ReconError> {
        let raw: HashMap<String, Vec<DatasetEntry>> = serde_json::from_str(content)?;
        Ok(Self {
            entries: raw.into_iter().map(|(email, list)| (email.to_lowercase(), list)).collect(),
        })
    }
}

#[async_trait]
impl BreachLookup for LocalDataset {
    async fn lookup(&self, email: &str) -> Vec<BreachRecord> {
        let Some(entries) = self.entries.get(&email.to_lowercase()) else {
            return Vec::new();
        };
        entries
            .iter()
            .map(|e| BreachRecord {
                email: email.to_string(),
                breach_name: e.name.clone(),
                breach_date: e.breach_date.clone(),
                data_classes: e.data_classes.clone(),
                source: BreachSource::LocalDataset,
                severity: severity_for(&e.data_classes),
            })
            .collect()
    }

    fn source(&self) -> BreachSource {
        BreachSource::LocalDataset
    }
}
