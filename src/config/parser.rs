use std::path::Path;

use super::schema::CONFIG_SCHEMA;
use super::security::validate_security_patterns;
use super::types::{BreachMode, ReconConfig};
use crate::errors::ReconError;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<ReconConfig, ReconError> {
    if !path.exists() {
        return Err(ReconError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ReconError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Parse and validate config text. Empty input yields the defaults.
pub fn parse_config_str(content: &str) -> Result<ReconConfig, ReconError> {
    if content.trim().is_empty() {
        return Ok(ReconConfig::default());
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    validate_security_patterns(&yaml)?;
    validate_schema(&yaml)?;

    let config: ReconConfig = serde_yaml::from_value(yaml)?;
    validate_semantics(&config)?;

    Ok(config)
}

/// Schema findings are advisory: logged, never fatal.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ReconError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| ReconError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ReconError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}

fn validate_semantics(config: &ReconConfig) -> Result<(), ReconError> {
    if config.breach.mode == BreachMode::Local && config.breach.dataset_path.is_none() {
        return Err(ReconError::Config(
            "breach.mode 'local' requires breach.dataset_path".into(),
        ));
    }

    if config.scan.directory_batch_size == 0 {
        return Err(ReconError::Config("scan.directory_batch_size must be at least 1".into()));
    }

    if config.worker.concurrency == 0 {
        return Err(ReconError::Config("worker.concurrency must be at least 1".into()));
    }

    if config.breach.mode == BreachMode::Remote && config.breach.resolved_key().is_none() {
        warn!("Remote breach lookups configured without an API key; lookups will return no records");
    }

    Ok(())
}
