use serde::{Deserialize, Serialize};

use super::finding::Severity;

/// Which breach intelligence source produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreachSource {
    Hibp,
    LocalDataset,
}

impl BreachSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hibp => "hibp",
            Self::LocalDataset => "local-dataset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hibp" => Some(Self::Hibp),
            "local-dataset" => Some(Self::LocalDataset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachRecord {
    pub email: String,
    pub breach_name: String,
    pub breach_date: String,
    pub data_classes: Vec<String>,
    pub source: BreachSource,
    pub severity: Severity,
}
