use super::types::{ProviderError, ReconError};

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

/// Errors that can be routed through `with_retry`.
pub trait Classify {
    fn classify(&self) -> ErrorClassification;
}

impl Classify for ReconError {
    /// Classify this error to determine its type and whether it can be retried.
    fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            ReconError::Transient(_) => ErrorClassification {
                error_type: "TransientError",
                retryable: true,
            },
            ReconError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                retryable: true,
            },
            ReconError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            ReconError::Notification(_) => ErrorClassification {
                error_type: "NotificationError",
                retryable: true,
            },
            ReconError::Queue(_) => ErrorClassification {
                error_type: "QueueError",
                retryable: true,
            },

            // Non-retryable errors
            ReconError::QuotaExceeded(_) => ErrorClassification {
                error_type: "QuotaExceededError",
                retryable: false,
            },
            ReconError::MissingCredentials(_) => ErrorClassification {
                error_type: "MissingCredentialsError",
                retryable: false,
            },
            ReconError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            ReconError::InvalidTarget(_) => ErrorClassification {
                error_type: "InvalidTargetError",
                retryable: false,
            },
            ReconError::Parse(_) => ErrorClassification {
                error_type: "ParseError",
                retryable: false,
            },
            ReconError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            ReconError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            ReconError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}

impl Classify for ProviderError {
    fn classify(&self) -> ErrorClassification {
        match self {
            ProviderError::TransientError { .. } => ErrorClassification {
                error_type: "TransientError",
                retryable: true,
            },
            // Retrying an exhausted quota in the same round cannot succeed.
            ProviderError::QuotaExceeded { .. } => ErrorClassification {
                error_type: "QuotaExceededError",
                retryable: false,
            },
            ProviderError::MissingCredentials { .. } => ErrorClassification {
                error_type: "MissingCredentialsError",
                retryable: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_is_retryable() {
        let err = ReconError::Transient("connection reset".into());
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.error_type, "TransientError");
    }

    #[test]
    fn test_quota_not_retryable() {
        let err = ReconError::QuotaExceeded("daily limit".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert_eq!(class.error_type, "QuotaExceededError");
    }

    #[test]
    fn test_config_error_not_retryable() {
        let err = ReconError::Config("invalid config".into());
        assert!(!err.classify().retryable);
    }

    #[test]
    fn test_provider_quota_not_retryable() {
        assert!(!ProviderError::quota("shodan", "402").classify().retryable);
        assert!(!ProviderError::missing("shodan").classify().retryable);
        assert!(ProviderError::transient("shodan", "503").classify().retryable);
    }
}
