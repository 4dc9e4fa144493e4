use crate::errors::ReconError;

/// Substrings that never belong in a recon config value.
const DANGEROUS_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
];

/// Only rejected in URL values; relative file paths legitimately climb directories.
const TRAVERSAL_PATTERNS: &[&str] = &["../", "..\\"];

fn is_url_key(path: &[String]) -> bool {
    path.last().is_some_and(|key| key.ends_with("url"))
}

/// Walk the raw YAML tree and reject values carrying traversal or script payloads.
pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), ReconError> {
    let mut path = Vec::new();
    walk(value, &mut path)
}

fn walk(value: &serde_yaml::Value, path: &mut Vec<String>) -> Result<(), ReconError> {
    match value {
        serde_yaml::Value::String(s) => check_string(s, path),
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                path.push(k.as_str().unwrap_or("?").to_string());
                walk(v, path)?;
                path.pop();
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                path.push(format!("[{}]", i));
                walk(v, path)?;
                path.pop();
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_string(s: &str, path: &[String]) -> Result<(), ReconError> {
    let lower = s.to_lowercase();
    let traversal: &[&str] = if is_url_key(path) { TRAVERSAL_PATTERNS } else { &[] };
    match DANGEROUS_PATTERNS.iter().chain(traversal).find(|p| lower.contains(**p)) {
        Some(pattern) => {
            let location = if path.is_empty() { "root".to_string() } else { path.join(".") };
            Err(ReconError::Config(format!(
                "Dangerous pattern '{}' found at config path: {}",
                pattern, location
            )))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_safe_config_passes() {
        let value = yaml("providers:\n  host:\n    api_key: $SHODAN_KEY\ndatabase:\n  path: ./data/recon.db");
        assert!(validate_security_patterns(&value).is_ok());
    }

    #[test]
    fn test_traversal_in_url_blocked() {
        let value = yaml("providers:\n  host:\n    base_url: 'https://api.example.com/../../admin'");
        let err = validate_security_patterns(&value).unwrap_err();
        assert!(err.to_string().contains("providers.host.base_url"));

        let value = yaml("notifications:\n  webhook_url: 'http://hooks.local/..\\\\x'");
        assert!(validate_security_patterns(&value).is_err());
    }

    #[test]
    fn test_relative_file_paths_allowed() {
        let value = yaml("breach:\n  dataset_path: ../shared/breaches.json\ndatabase:\n  path: ../data/recon.db");
        assert!(validate_security_patterns(&value).is_ok());
    }

    #[test]
    fn test_script_url_blocked() {
        assert!(validate_security_patterns(&yaml("notifications:\n  webhook_url: 'javascript:void(0)'")).is_err());
        assert!(validate_security_patterns(&yaml("url: 'file:///etc/passwd'")).is_err());
    }

    #[test]
    fn test_array_dangerous_pattern_blocked() {
        let value = yaml("items:\n  - ok\n  - '<script>alert(1)'");
        let err = validate_security_patterns(&value).unwrap_err();
        assert!(err.to_string().contains("items.[1]"));
    }

    #[test]
    fn test_numeric_values_pass() {
        assert!(validate_security_patterns(&yaml("worker:\n  concurrency: 3\ncache:\n  enabled: true")).is_ok());
    }
}
