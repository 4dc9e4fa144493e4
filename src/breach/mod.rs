pub mod hibp;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BreachConfig, BreachMode};
use crate::errors::ReconError;
use crate::models::{BreachRecord, BreachSource, Severity};

pub use hibp::HibpClient;
pub use local::LocalDataset;

/// Credential-exposure lookup for one email address. Lookups never fail:
/// unavailable sources produce an empty list.
#[async_trait]
pub trait BreachLookup: Send + Sync {
    async fn lookup(&self, email: &str) -> Vec<BreachRecord>;

    fn source(&self) -> BreachSource;
}

const CRITICAL_CLASSES: &[&str] = &["password", "credit card", "bank", "financial", "payment"];
const HIGH_CLASSES: &[&str] = &["phone", "address"];
const MEDIUM_CLASSES: &[&str] = &["email", "username"];

fn mentions(class: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| class.contains(n))
}

/// Severity of a breach from the kinds of data it exposed.
pub fn severity_for(data_classes: &[String]) -> Severity {
    let classes: Vec<String> = data_classes.iter().map(|c| c.to_lowercase()).collect();
    // "Email addresses" and "IP addresses" identify an account, not a location
    let is_location = |c: &String| mentions(c, HIGH_CLASSES) && !mentions(c, &["email", "ip address"]);

    if classes.iter().any(|c| mentions(c, CRITICAL_CLASSES)) {
        Severity::Critical
    } else if classes.iter().any(is_location) {
        Severity::High
    } else if classes.iter().any(|c| mentions(c, MEDIUM_CLASSES)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Build the configured lookup. The mode is fixed for the process lifetime.
pub fn from_config(config: &BreachConfig) -> Result<Arc<dyn BreachLookup>, ReconError> {
    match config.mode {
        BreachMode::Remote => Ok(Arc::new(HibpClient::new(config.resolved_key())?)),
        BreachMode::Local => {
            let path = config
                .dataset_path
                .as_deref()
                .ok_or_else(|| ReconError::Config("breach.dataset_path is required in local mode".into()))?;
            Ok(Arc::new(LocalDataset::load(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_severity_ladder() {
        assert_eq!(severity_for(&classes(&["Email addresses", "Passwords"])), Severity::Critical);
        assert_eq!(severity_for(&classes(&["Credit cards"])), Severity::Critical);
        assert_eq!(severity_for(&classes(&["Email addresses", "Phone numbers"])), Severity::High);
        assert_eq!(severity_for(&classes(&["Physical addresses"])), Severity::High);
        assert_eq!(severity_for(&classes(&["Email addresses", "Usernames"])), Severity::Medium);
        assert_eq!(severity_for(&classes(&["Email addresses", "IP addresses"])), Severity::Medium);
        assert_eq!(severity_for(&classes(&["Genders"])), Severity::Low);
        assert_eq!(severity_for(&[]), Severity::Low);
    }

    #[test]
    fn test_local_mode_requires_dataset() {
        let config = BreachConfig { mode: BreachMode::Local, api_key: None, dataset_path: None };
        assert!(matches!(from_config(&config), Err(ReconError::Config(_))));
    }

    #[test]
    fn test_remote_mode_without_key_still_builds() {
        let config = BreachConfig { mode: BreachMode::Remote, api_key: None, dataset_path: None };
        assert_eq!(from_config(&config).unwrap().source(), BreachSource::Hibp);
    }
}
