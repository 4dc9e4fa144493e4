use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{OutdatedSoftware, PortFinding, Severity};

struct MinimumVersion {
    /// Lower-case whole-name spellings seen in banners and provider product fields.
    aliases: &'static [&'static str],
    product: &'static str,
    minimum: &'static str,
    severity: Severity,
}

const MINIMUM_VERSIONS: &[MinimumVersion] = &[
    MinimumVersion { aliases: &["openssh"], product: "OpenSSH", minimum: "8.0", severity: Severity::High },
    MinimumVersion {
        aliases: &["apache", "apache httpd", "apache http server"],
        product: "Apache",
        minimum: "2.4.50",
        severity: Severity::High,
    },
    MinimumVersion { aliases: &["nginx"], product: "nginx", minimum: "1.20", severity: Severity::Medium },
    MinimumVersion { aliases: &["vsftpd"], product: "vsftpd", minimum: "3.0", severity: Severity::Medium },
    MinimumVersion {
        aliases: &["iis", "microsoft-iis", "microsoft iis", "microsoft iis httpd"],
        product: "IIS",
        minimum: "10.0",
        severity: Severity::Medium,
    },
    MinimumVersion { aliases: &["php"], product: "PHP", minimum: "8.0", severity: Severity::High },
    MinimumVersion { aliases: &["openssl"], product: "OpenSSL", minimum: "1.1.1", severity: Severity::Critical },
];

static BANNER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(OpenSSH|Apache|nginx|vsftpd|Microsoft-IIS|IIS|PHP|OpenSSL)[/_ ]v?(\d+(?:\.\d+)*[a-z]?)")
        .expect("valid banner regex")
});

/// Product name without any trailing version words, lower-cased.
fn product_name(product: &str) -> String {
    product
        .split_whitespace()
        .take_while(|word| !word.starts_with(|c: char| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whole-name match only, so "phpMyAdmin" is not PHP and "Apache Kafka" is not httpd.
fn rule_for(product: &str) -> Option<&'static MinimumVersion> {
    let name = product_name(product);
    MINIMUM_VERSIONS.iter().find(|rule| rule.aliases.contains(&name.as_str()))
}

/// Numeric comparison of dotted versions; trailing letters are ignored.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| {
                let digits: String = p.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };
    let (pa, pb) = (parts(a), parts(b));
    for i in 0..pa.len().max(pb.len()) {
        match pa.get(i).unwrap_or(&0).cmp(pb.get(i).unwrap_or(&0)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// (product, version) pairs advertised by one port.
fn identify(port: &PortFinding) -> Vec<(String, String)> {
    let mut found = Vec::new();
    if let (Some(product), Some(version)) = (&port.product, &port.version) {
        found.push((product.clone(), version.clone()));
    }
    if let Some(banner) = &port.banner {
        for cap in BANNER_VERSION.captures_iter(banner) {
            found.push((cap[1].to_string(), cap[2].to_string()));
        }
    }
    found
}

/// Software on open ports running below its minimum supported version.
pub fn detect_outdated(ports: &[PortFinding]) -> Vec<OutdatedSoftware> {
    let mut seen = HashSet::new();
    let mut outdated = Vec::new();

    for port in ports {
        for (name, version) in identify(port) {
            let Some(rule) = rule_for(&name) else { continue };
            if compare_versions(&version, rule.minimum) != Ordering::Less {
                continue;
            }
            if seen.insert((rule.product, version.clone(), port.port)) {
                outdated.push(OutdatedSoftware {
                    product: rule.product.to_string(),
                    version,
                    minimum_version: rule.minimum.to_string(),
                    port: Some(port.port),
                    severity: rule.severity,
                });
            }
        }
    }
    outdated
}
