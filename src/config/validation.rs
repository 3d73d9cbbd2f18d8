//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the relay prefix and mirror prefixes are well-formed paths
//! - Ensure the auth gate has credentials when enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::RelayConfig;

#[derive(Debug)]
pub enum ValidationError {
    InvalidPort,
    InvalidRelayPrefix(String),
    ChallengeWithoutUsers,
    InvalidMirrorPrefix(String),
    InvalidMirrorUpstream(String),
    InvalidPagePath(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidPort => write!(f, "port must be non-zero"),
            ValidationError::InvalidRelayPrefix(p) => {
                write!(f, "relay prefix '{}' must start and end with '/'", p)
            }
            ValidationError::ChallengeWithoutUsers => {
                write!(f, "challenge is enabled but no users are configured")
            }
            ValidationError::InvalidMirrorPrefix(p) => {
                write!(f, "mirror prefix '{}' must start and end with '/'", p)
            }
            ValidationError::InvalidMirrorUpstream(u) => {
                write!(f, "mirror upstream '{}' is not an http(s) URL", u)
            }
            ValidationError::InvalidPagePath(p) => {
                write!(f, "page path '{}' must start with '/'", p)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    let prefix = &config.relay.prefix;
    if !prefix.starts_with('/') || !prefix.ends_with('/') || prefix.len() < 2 {
        errors.push(ValidationError::InvalidRelayPrefix(prefix.clone()));
    }

    if config.challenge && config.users.is_empty() {
        errors.push(ValidationError::ChallengeWithoutUsers);
    }

    for mirror in &config.mirrors {
        if !mirror.prefix.starts_with('/') || !mirror.prefix.ends_with('/') {
            errors.push(ValidationError::InvalidMirrorPrefix(mirror.prefix.clone()));
        }
        match Url::parse(&mirror.upstream) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::InvalidMirrorUpstream(mirror.upstream.clone())),
        }
    }

    for page in &config.pages {
        if !page.path.starts_with('/') {
            errors.push(ValidationError::InvalidPagePath(page.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let mut config = RelayConfig::default();
        config.relay.prefix = "relay".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidRelayPrefix(_))));
    }

    #[test]
    fn test_challenge_requires_users() {
        let mut config = RelayConfig::default();
        config.challenge = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ChallengeWithoutUsers)));

        config.users.insert("admin".into(), "secret".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_collected() {
        let mut config = RelayConfig::default();
        config.port = 0;
        config.challenge = true;
        config.relay.prefix = "bad".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
