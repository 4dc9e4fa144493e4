use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::ReconError;

/// One stage a scan request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanType {
    PortScan,
    SslCheck,
    SubdomainEnum,
    DirectoryScan,
    BreachCheck,
    RiskCalc,
}

impl ScanType {
    /// Execution order of the stages.
    pub const ALL: [ScanType; 6] = [
        ScanType::PortScan,
        ScanType::SslCheck,
        ScanType::SubdomainEnum,
        ScanType::DirectoryScan,
        ScanType::BreachCheck,
        ScanType::RiskCalc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PortScan => "port-scan",
            Self::SslCheck => "ssl-check",
            Self::SubdomainEnum => "subdomain-enum",
            Self::DirectoryScan => "directory-scan",
            Self::BreachCheck => "breach-check",
            Self::RiskCalc => "risk-calc",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReconError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| ReconError::Config(format!("Unknown scan type: {}", s)))
    }

    /// Parse a comma-separated list; empty input selects every stage.
    pub fn parse_list(s: &str) -> Result<BTreeSet<ScanType>, ReconError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return Ok(Self::ALL.into_iter().collect());
        }
        parts.into_iter().map(Self::parse).collect()
    }
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to scan one domain, as submitted to the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    pub job_id: String,
    pub tenant_id: String,
    pub domain: String,
    pub types: BTreeSet<ScanType>,
    pub priority: i32,
    /// ScanResult created alongside the job.
    pub scan_id: String,
}

/// Submission parameters for a new job; ids are assigned by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScanJob {
    pub tenant_id: String,
    pub domain: String,
    pub types: BTreeSet<ScanType>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalise user input into a bare lower-case host name.
pub fn normalize_domain(input: &str) -> Result<String, ReconError> {
    let trimmed = input.trim();
    let without_scheme = trimmed.split("://").nth(1).unwrap_or(trimmed);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host = host.split(':').next().unwrap_or(host).trim_end_matches('.').to_lowercase();

    let valid = !host.is_empty()
        && host.len() <= 253
        && host.contains('.')
        && host
            .split('.')
            .all(|label| {
                !label.is_empty()
                    && label.len() <= 63
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });

    if valid {
        Ok(host)
    } else {
        Err(ReconError::InvalidTarget(input.to_string()))
    }
}
