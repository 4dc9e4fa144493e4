use serde::{Deserialize, Serialize};

/// Severity level for a risk finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Returns a numeric rank where lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of exposure a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCategory {
    OpenPort,
    Tls,
    CredentialExposure,
    OutdatedSoftware,
    Vulnerability,
}

/// A single weighted finding produced by the risk engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFinding {
    pub id: String,
    pub category: FindingCategory,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub recommendation: String,
    /// Host, port, certificate or mailbox the finding is about.
    pub affected_asset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskCategory {
    /// Higher score means lower risk.
    pub fn from_score(score: u8) -> Self {
        match score {
            75..=u8::MAX => RiskCategory::Low,
            50..=74 => RiskCategory::Medium,
            25..=49 => RiskCategory::High,
            _ => RiskCategory::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
            RiskCategory::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored snapshot of the findings derived from one completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: u8,
    pub category: RiskCategory,
    pub findings: Vec<RiskFinding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rank_ordering() {
        assert!(Severity::Critical.rank() < Severity::High.rank());
        assert!(Severity::High.rank() < Severity::Medium.rank());
        assert!(Severity::Medium.rank() < Severity::Low.rank());
    }

    #[test]
    fn test_risk_category_thresholds() {
        assert_eq!(RiskCategory::from_score(100), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(75), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(74), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(50), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(49), RiskCategory::High);
        assert_eq!(RiskCategory::from_score(25), RiskCategory::High);
        assert_eq!(RiskCategory::from_score(24), RiskCategory::Critical);
        assert_eq!(RiskCategory::from_score(0), RiskCategory::Critical);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }
}
