use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::finding::{RiskFinding, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Only pending→running→{completed,failed} is allowed.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortFinding {
    pub port: u16,
    pub state: PortState,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl PortFinding {
    pub fn open(port: u16, service: &str) -> Self {
        Self {
            port,
            state: PortState::Open,
            service: service.to_string(),
            product: None,
            version: None,
            banner: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsFinding {
    pub domain: String,
    pub issuer: String,
    pub subject: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub weak_ciphers: Vec<String>,
    pub is_valid: bool,
    /// Set when the port accepted a connection but no usable handshake followed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake_error: Option<String>,
}

impl TlsFinding {
    /// Builds a finding with `is_valid` derived from expiry and cipher state.
    pub fn new(
        domain: &str,
        issuer: String,
        subject: Option<String>,
        valid_from: Option<DateTime<Utc>>,
        valid_to: DateTime<Utc>,
        days_until_expiry: i64,
        weak_ciphers: Vec<String>,
    ) -> Self {
        let is_valid = days_until_expiry > 0 && weak_ciphers.is_empty();
        Self {
            domain: domain.to_string(),
            issuer,
            subject,
            valid_from,
            valid_to,
            days_until_expiry,
            weak_ciphers,
            is_valid,
            handshake_error: None,
        }
    }

    /// Result returned when the host could not be inspected at all.
    pub fn unreachable(domain: &str) -> Self {
        Self::new(
            domain,
            "Unknown".to_string(),
            None,
            None,
            DateTime::<Utc>::default(),
            -1,
            Vec::new(),
        )
    }

    /// The port answered but refused or garbled the handshake.
    pub fn handshake_refused(domain: &str, reason: &str) -> Self {
        Self {
            handshake_error: Some(reason.to_string()),
            ..Self::unreachable(domain)
        }
    }

    /// Handshake completed on an anonymous suite, so there is no certificate to read.
    pub fn without_certificate(domain: &str, weak_ciphers: Vec<String>) -> Self {
        Self {
            weak_ciphers,
            ..Self::unreachable(domain)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.days_until_expiry <= 0
    }

    /// False for the placeholders, where no certificate was read.
    pub fn has_certificate(&self) -> bool {
        self.valid_to.timestamp() != 0 || self.subject.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubdomainStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubdomainFinding {
    pub subdomain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub status: SubdomainStatus,
}

impl SubdomainFinding {
    pub fn active(subdomain: &str, ip: String) -> Self {
        Self { subdomain: subdomain.to_string(), ip: Some(ip), status: SubdomainStatus::Active }
    }

    pub fn inactive(subdomain: &str) -> Self {
        Self { subdomain: subdomain.to_string(), ip: None, status: SubdomainStatus::Inactive }
    }
}

/// A path that answered HTTP 200 during directory probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPath {
    pub path: String,
    pub status: u16,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Software found running below its minimum supported version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutdatedSoftware {
    pub product: String,
    pub version: String,
    pub minimum_version: String,
    pub port: Option<u16>,
    pub severity: Severity,
}

/// The mutable record of one reconnaissance run against a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub id: String,
    pub tenant_id: String,
    pub domain: String,
    pub status: ScanStatus,
    pub ports: Vec<PortFinding>,
    pub tls_finding: Option<TlsFinding>,
    pub subdomains: Vec<SubdomainFinding>,
    pub discovered_paths: Vec<DiscoveredPath>,
    pub outdated_software: Vec<OutdatedSoftware>,
    /// Externally supplied vulnerability findings, carried into the assessment as-is.
    pub vulnerabilities: Vec<RiskFinding>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ScanResult {
    pub fn pending(id: &str, tenant_id: &str, domain: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            domain: domain.to_string(),
            status: ScanStatus::Pending,
            ports: Vec::new(),
            tls_finding: None,
            subdomains: Vec::new(),
            discovered_paths: Vec::new(),
            outdated_software: Vec::new(),
            vulnerabilities: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// Replaces the port list, keeping only open ports, unique by number.
    pub fn set_ports(&mut self, ports: Vec<PortFinding>) {
        let mut seen = std::collections::HashSet::new();
        self.ports = ports
            .into_iter()
            .filter(|p| p.state == PortState::Open && seen.insert(p.port))
            .collect();
    }

    /// Replaces the subdomain list, unique by lower-cased name.
    pub fn set_subdomains(&mut self, subdomains: Vec<SubdomainFinding>) {
        let mut seen = std::collections::HashSet::new();
        self.subdomains = subdomains
            .into_iter()
            .filter(|s| seen.insert(s.subdomain.to_lowercase()))
            .collect();
    }

    pub fn open_port(&self, port: u16) -> Option<&PortFinding> {
        self.ports.iter().find(|p| p.port == port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(ScanStatus::Pending.can_transition_to(ScanStatus::Running));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Completed));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Failed));
        assert!(!ScanStatus::Pending.can_transition_to(ScanStatus::Completed));
        assert!(!ScanStatus::Completed.can_transition_to(ScanStatus::Running));
        assert!(!ScanStatus::Failed.can_transition_to(ScanStatus::Completed));
    }

    #[test]
    fn test_tls_validity_is_derived() {
        let now = Utc::now();
        let ok = TlsFinding::new("a.com", "CA".into(), None, None, now, 30, vec![]);
        assert!(ok.is_valid);

        let expired = TlsFinding::new("a.com", "CA".into(), None, None, now, 0, vec![]);
        assert!(!expired.is_valid);

        let weak = TlsFinding::new("a.com", "CA".into(), None, None, now, 90, vec!["RC4-MD5".into()]);
        assert!(!weak.is_valid);
    }

    #[test]
    fn test_unreachable_sentinel() {
        let t = TlsFinding::unreachable("down.example");
        assert_eq!(t.issuer, "Unknown");
        assert_eq!(t.days_until_expiry, -1);
        assert_eq!(t.valid_to.timestamp(), 0);
        assert!(!t.is_valid);
    }

    #[test]
    fn test_set_ports_keeps_unique_open() {
        let mut scan = ScanResult::pending("s", "t", "example.com");
        let mut closed = PortFinding::open(80, "http");
        closed.state = PortState::Closed;
        scan.set_ports(vec![
            PortFinding::open(22, "ssh"),
            PortFinding::open(22, "other"),
            closed,
        ]);
        assert_eq!(scan.ports.len(), 1);
        assert_eq!(scan.ports[0].service, "ssh");
    }

    #[test]
    fn test_set_subdomains_case_insensitive() {
        let mut scan = ScanResult::pending("s", "t", "example.com");
        scan.set_subdomains(vec![
            SubdomainFinding::inactive("WWW.example.com"),
            SubdomainFinding::inactive("www.example.com"),
        ]);
        assert_eq!(scan.subdomains.len(), 1);
    }
}
