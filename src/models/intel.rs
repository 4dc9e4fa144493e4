use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::finding::Severity;
use super::scan_result::{PortFinding, SubdomainFinding};

/// A vulnerability reported by an external intelligence source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    /// Identifier such as a CVE number.
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub affected_asset: String,
}

/// Transient bundle returned by an intelligence provider, consumed by the merge step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceData {
    pub ports: Vec<PortFinding>,
    pub subdomains: Vec<SubdomainFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<VulnerabilityRecord>>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl IntelligenceData {
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
            && self.subdomains.is_empty()
            && self.vulnerabilities.as_ref().map_or(true, |v| v.is_empty())
            && self.extra.is_empty()
    }
}
