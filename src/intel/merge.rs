use std::collections::HashSet;

use crate::models::IntelligenceData;

/// Fold `source` into `target`. Ports (by number) and subdomains (by lower-cased
/// name) keep the first-seen entry; `extra` keys from `source` override.
pub fn merge_into(target: &mut IntelligenceData, source: IntelligenceData) {
    let mut ports: HashSet<u16> = target.ports.iter().map(|p| p.port).collect();
    for port in source.ports {
        if ports.insert(port.port) {
            target.ports.push(port);
        }
    }

    let mut names: HashSet<String> = target.subdomains.iter().map(|s| s.subdomain.to_lowercase()).collect();
    for sub in source.subdomains {
        if names.insert(sub.subdomain.to_lowercase()) {
            target.subdomains.push(sub);
        }
    }

    if let Some(incoming) = source.vulnerabilities {
        let existing = target.vulnerabilities.get_or_insert_with(Vec::new);
        for vuln in incoming {
            if !existing.iter().any(|v| v.id == vuln.id && v.affected_asset == vuln.affected_asset) {
                existing.push(vuln);
            }
        }
    }

    target.extra.extend(source.extra);
}

/// Merge results in provider order.
pub fn merge_all(sources: impl IntoIterator<Item = IntelligenceData>) -> IntelligenceData {
    let mut merged = IntelligenceData::default();
    for source in sources {
        merge_into(&mut merged, source);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PortFinding, SubdomainFinding};
    use serde_json::json;

    fn data(ports: &[(u16, &str)], subs: &[&str], extra: &[(&str, serde_json::Value)]) -> IntelligenceData {
        IntelligenceData {
            ports: ports.iter().map(|(p, s)| PortFinding::open(*p, s)).collect(),
            subdomains: subs.iter().map(|s| SubdomainFinding::inactive(s)).collect(),
            vulnerabilities: None,
            extra: extra.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    #[test]
    fn test_first_seen_port_and_subdomain_win() {
        let a = data(&[(22, "ssh-vendor-a"), (80, "http")], &["WWW.example.com"], &[]);
        let b = data(&[(22, "ssh-vendor-b"), (443, "https")], &["www.example.com", "api.example.com"], &[]);

        let merged = merge_all([a, b]);
        let ports: Vec<(u16, &str)> = merged.ports.iter().map(|p| (p.port, p.service.as_str())).collect();
        assert_eq!(ports, vec![(22, "ssh-vendor-a"), (80, "http"), (443, "https")]);

        let subs: Vec<&str> = merged.subdomains.iter().map(|s| s.subdomain.as_str()).collect();
        assert_eq!(subs, vec!["WWW.example.com", "api.example.com"]);
    }

    #[test]
    fn test_extra_later_source_overrides() {
        let a = data(&[], &[], &[("asn", json!("AS1")), ("org", json!("Acme"))]);
        let b = data(&[], &[], &[("asn", json!("AS2"))]);
        let merged = merge_all([a, b]);
        assert_eq!(merged.extra["asn"], json!("AS2"));
        assert_eq!(merged.extra["org"], json!("Acme"));
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge_all(Vec::new()).is_empty());
    }
}
