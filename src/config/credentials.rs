use tracing::debug;

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference. Empty or unresolved values yield `None`.
pub fn resolve_credential(value: &str) -> Option<String> {
    let resolved = if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, credential disabled");
                return None;
            }
        }
    } else {
        value.to_string()
    };

    let trimmed = resolved.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Mask an API key for logs, keeping only the last four characters.
pub fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "[REDACTED]".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("[REDACTED]…{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_credential_literal() {
        assert_eq!(resolve_credential("abc123"), Some("abc123".to_string()));
    }

    #[test]
    fn test_resolve_credential_env_var() {
        std::env::set_var("TEST_RECONLENS_CRED", "secret123");
        assert_eq!(resolve_credential("$TEST_RECONLENS_CRED"), Some("secret123".to_string()));
        std::env::remove_var("TEST_RECONLENS_CRED");
    }

    #[test]
    fn test_resolve_credential_missing_env_var() {
        assert_eq!(resolve_credential("$NONEXISTENT_RECONLENS_VAR"), None);
    }

    #[test]
    fn test_resolve_credential_blank() {
        assert_eq!(resolve_credential("   "), None);
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(redact_key("abcdef123456"), "[REDACTED]…3456");
        assert_eq!(redact_key("abc"), "[REDACTED]");
    }
}
