use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of a single intelligence provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No API key configured; the provider is effectively disabled.
    #[error("{provider}: missing credentials")]
    MissingCredentials { provider: String },

    #[error("{provider}: quota exceeded: {message}")]
    QuotaExceeded { provider: String, message: String },

    #[error("{provider}: {message}")]
    TransientError { provider: String, message: String },
}

impl ProviderError {
    pub fn missing(provider: &str) -> Self {
        Self::MissingCredentials { provider: provider.to_string() }
    }

    pub fn quota(provider: &str, message: impl Into<String>) -> Self {
        Self::QuotaExceeded { provider: provider.to_string(), message: message.into() }
    }

    pub fn transient(provider: &str, message: impl Into<String>) -> Self {
        Self::TransientError { provider: provider.to_string(), message: message.into() }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredentials { .. })
    }
}

impl From<ProviderError> for ReconError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredentials { provider } => ReconError::MissingCredentials(provider),
            ProviderError::QuotaExceeded { provider, message } => {
                ReconError::QuotaExceeded(format!("{}: {}", provider, message))
            }
            ProviderError::TransientError { provider, message } => {
                ReconError::Transient(format!("{}: {}", provider, message))
            }
        }
    }
}

impl From<rusqlite::Error> for ReconError {
    fn from(err: rusqlite::Error) -> Self {
        ReconError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_conversion() {
        let err: ReconError = ProviderError::quota("shodan", "monthly credits used").into();
        assert!(matches!(err, ReconError::QuotaExceeded(ref m) if m.contains("shodan")));

        let err: ReconError = ProviderError::missing("securitytrails").into();
        assert!(matches!(err, ReconError::MissingCredentials(_)));
    }

    #[test]
    fn test_provider_error_predicates() {
        assert!(ProviderError::quota("a", "x").is_quota());
        assert!(!ProviderError::transient("a", "x").is_quota());
        assert!(ProviderError::missing("a").is_missing_credentials());
    }
}
