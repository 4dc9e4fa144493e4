use std::collections::BTreeSet;

use tracing::info;

use crate::models::{
    BreachRecord, FindingCategory, RiskAssessment, RiskCategory, RiskFinding, ScanResult, Severity,
    VulnerabilityRecord,
};

/// Services that should never face the internet, keyed by label and default port.
const DANGEROUS_SERVICES: &[(&str, u16, Severity, &str)] = &[
    ("ftp", 21, Severity::High, "Replace FTP with SFTP or restrict it to a VPN."),
    ("telnet", 23, Severity::Critical, "Disable telnet and use SSH instead."),
    ("rdp", 3389, Severity::High, "Put RDP behind a VPN or gateway with MFA."),
    ("vnc", 5900, Severity::High, "Restrict VNC to trusted networks and require strong authentication."),
    ("redis", 6379, Severity::Critical, "Bind Redis to localhost or a private network and enable AUTH."),
    ("mongodb", 27017, Severity::Critical, "Bind MongoDB to a private interface and enable access control."),
    ("mysql", 3306, Severity::High, "Block public access to MySQL with a firewall rule."),
    ("postgresql", 5432, Severity::High, "Block public access to PostgreSQL with a firewall rule."),
];

const EXPIRY_WARNING_DAYS: i64 = 30;

/// Score deduction per finding. Ordered critical > high > medium > low.
pub fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 15,
        Severity::Medium => 8,
        Severity::Low => 3,
    }
}

/// 100 minus the summed weights, floored at 0.
pub fn score(findings: &[RiskFinding]) -> u8 {
    let deduction: u32 = findings.iter().map(|f| severity_weight(f.severity)).sum();
    100u32.saturating_sub(deduction) as u8
}

fn finding(
    id: String,
    category: FindingCategory,
    severity: Severity,
    title: String,
    description: String,
    recommendation: &str,
    affected_asset: &str,
) -> RiskFinding {
    RiskFinding {
        id,
        category,
        title,
        description,
        severity,
        recommendation: recommendation.to_string(),
        affected_asset: affected_asset.to_string(),
    }
}

fn port_findings(scan: &ScanResult) -> Vec<RiskFinding> {
    scan.ports
        .iter()
        .filter_map(|port| {
            let (label, _, severity, advice) = DANGEROUS_SERVICES
                .iter()
                .find(|(label, default_port, _, _)| port.service.eq_ignore_ascii_case(label) || port.port == *default_port)?;
            Some(finding(
                format!("open-port-{}", port.port),
                FindingCategory::OpenPort,
                *severity,
                format!("{} exposed on port {}", label.to_uppercase(), port.port),
                format!("{} is reachable from the internet on {}:{}.", label, scan.domain, port.port),
                advice,
                &format!("{}:{}", scan.domain, port.port),
            ))
        })
        .collect()
}

fn tls_findings(scan: &ScanResult) -> Vec<RiskFinding> {
    let Some(tls) = scan.tls_finding.as_ref() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    if let Some(reason) = &tls.handshake_error {
        out.push(finding(
            "tls-handshake-refused".into(),
            FindingCategory::Tls,
            Severity::Medium,
            "TLS handshake refused".into(),
            format!("{} accepted the connection but no TLS session could be negotiated: {}.", tls.domain, reason),
            "Check the endpoint's TLS configuration and protocol support.",
            &tls.domain,
        ));
    }

    // Placeholder dates say nothing about a certificate
    let dated = tls.has_certificate();
    if dated && tls.is_expired() {
        out.push(finding(
            "tls-expired".into(),
            FindingCategory::Tls,
            Severity::Critical,
            "TLS certificate expired".into(),
            format!("The certificate for {} expired on {}.", tls.domain, tls.valid_to.format("%Y-%m-%d")),
            "Renew the certificate and enable automated renewal.",
            &tls.domain,
        ));
    } else if dated && tls.days_until_expiry <= EXPIRY_WARNING_DAYS {
        out.push(finding(
            "tls-expiring".into(),
            FindingCategory::Tls,
            Severity::Medium,
            "TLS certificate expiring soon".into(),
            format!("The certificate for {} expires in {} days.", tls.domain, tls.days_until_expiry),
            "Renew the certificate before it expires.",
            &tls.domain,
        ));
    }

    for cipher in &tls.weak_ciphers {
        out.push(finding(
            format!("tls-weak-cipher-{}", cipher.to_lowercase()),
            FindingCategory::Tls,
            Severity::High,
            format!("Weak cipher suite {}", cipher),
            format!("{} negotiated the weak cipher suite {}.", tls.domain, cipher),
            "Disable legacy cipher suites and allow only AEAD ciphers.",
            &tls.domain,
        ));
    }
    out
}

fn breach_findings(breaches: &[BreachRecord]) -> Vec<RiskFinding> {
    let affected = |severity: Severity| -> BTreeSet<&str> {
        breaches
            .iter()
            .filter(|b| b.severity == severity)
            .map(|b| b.email.as_str())
            .collect()
    };

    let mut out = Vec::new();
    let critical = affected(Severity::Critical);
    if !critical.is_empty() {
        let emails = critical.into_iter().collect::<Vec<_>>().join(", ");
        out.push(finding(
            "breach-critical".into(),
            FindingCategory::CredentialExposure,
            Severity::Critical,
            "Passwords or financial data exposed in breaches".into(),
            format!("Credentials or financial data for these accounts appear in known breaches: {}.", emails),
            "Force password resets for the affected accounts and enforce MFA.",
            &emails,
        ));
    }

    let high = affected(Severity::High);
    if !high.is_empty() {
        let emails = high.into_iter().collect::<Vec<_>>().join(", ");
        out.push(finding(
            "breach-high".into(),
            FindingCategory::CredentialExposure,
            Severity::High,
            "Personal contact data exposed in breaches".into(),
            format!("Phone numbers or addresses for these accounts appear in known breaches: {}.", emails),
            "Warn the affected users about targeted phishing.",
            &emails,
        ));
    }
    out
}

fn outdated_findings(scan: &ScanResult) -> Vec<RiskFinding> {
    scan.outdated_software
        .iter()
        .map(|sw| {
            let asset = match sw.port {
                Some(port) => format!("{}:{}", scan.domain, port),
                None => scan.domain.clone(),
            };
            finding(
                format!("outdated-{}-{}", sw.product.to_lowercase(), sw.port.unwrap_or(0)),
                FindingCategory::OutdatedSoftware,
                sw.severity,
                format!("Outdated {} {}", sw.product, sw.version),
                format!("{} {} is older than the minimum supported {}.", sw.product, sw.version, sw.minimum_version),
                &format!("Upgrade {} to {} or later.", sw.product, sw.minimum_version),
                &asset,
            )
        })
        .collect()
}

/// Externally reported vulnerability as a pass-through finding.
pub fn vulnerability_finding(vuln: &VulnerabilityRecord) -> RiskFinding {
    finding(
        vuln.id.clone(),
        FindingCategory::Vulnerability,
        vuln.severity,
        vuln.title.clone(),
        vuln.description.clone(),
        &format!("Apply the vendor fix for {}.", vuln.id),
        &vuln.affected_asset,
    )
}

/// All findings for a scan, in rule order.
pub fn findings(scan: &ScanResult, breaches: &[BreachRecord]) -> Vec<RiskFinding> {
    let mut out = port_findings(scan);
    out.extend(tls_findings(scan));
    out.extend(breach_findings(breaches));
    out.extend(outdated_findings(scan));
    out.extend(scan.vulnerabilities.iter().cloned());
    out
}

pub fn assess(scan: &ScanResult, breaches: &[BreachRecord]) -> RiskAssessment {
    let findings = findings(scan, breaches);
    let score = score(&findings);
    let category = RiskCategory::from_score(score);
    info!(scan_id = %scan.id, domain = %scan.domain, findings = findings.len(), score, category = %category, "Risk assessed");
    RiskAssessment { score, category, findings }
}
