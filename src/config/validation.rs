//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and canister ids
//! - Validate value ranges (timeouts > 0, body size > 0)
//! - Detect duplicate aliases
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use candid::Principal;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if !matches!(config.listener.public_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "listener.public_scheme",
            "must be 'http' or 'https'",
        ));
    }

    let root = config.domain.root.trim();
    if root.is_empty() || root.starts_with('.') || root.ends_with('.') {
        errors.push(ValidationError::new(
            "domain.root",
            format!("'{}' is not a domain", config.domain.root),
        ));
    }

    let mut hosts = HashSet::new();
    for (i, alias) in config.domain.aliases.iter().enumerate() {
        let field = format!("domain.aliases[{}]", i);
        if Principal::from_text(&alias.canister_id).is_err() {
            errors.push(ValidationError::new(
                format!("{}.canister_id", field),
                format!("'{}' is not a canister id", alias.canister_id),
            ));
        }
        if !hosts.insert(alias.host.to_ascii_lowercase()) {
            errors.push(ValidationError::new(
                format!("{}.host", field),
                format!("duplicate alias '{}'", alias.host),
            ));
        }
    }

    if let Some(url) = &config.replica.url {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "replica.url",
                format!("'{}' is not an http(s) URL", url),
            )),
        }
    }
    if config.replica.max_certificate_age_secs == 0 {
        errors.push(ValidationError::new(
            "replica.max_certificate_age_secs",
            "must be greater than zero",
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than zero"));
    }

    for (i, host) in config.security.passthrough_hosts.iter().enumerate() {
        let host = host.trim().trim_start_matches('.');
        if host.is_empty() || host.contains('/') || host.contains(':') {
            errors.push(ValidationError::new(
                format!("security.passthrough_hosts[{}]", i),
                format!("'{}' is not a host name", host),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
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
    use crate::config::schema::AliasConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.replica.url = Some("ftp://replica".to_string());
        config.timeouts.request_secs = 0;

        let fields: Vec<String> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();

        assert_eq!(
            fields,
            vec!["listener.bind_address", "replica.url", "timeouts.request_secs"]
        );
    }

    #[test]
    fn test_passthrough_hosts_must_be_host_names() {
        let mut config = GatewayConfig::default();
        config.security.passthrough_hosts = vec![
            "cdn.example.com".to_string(),
            "https://evil.example".to_string(),
            "".to_string(),
        ];

        let fields: Vec<String> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();

        assert_eq!(
            fields,
            vec!["security.passthrough_hosts[1]", "security.passthrough_hosts[2]"]
        );
    }

    #[test]
    fn test_bad_and_duplicate_aliases() {
        let mut config = GatewayConfig::default();
        config.domain.aliases = vec![
            AliasConfig {
                host: "a.example".to_string(),
                canister_id: "not-a-principal!".to_string(),
                domain: "ic0.app".to_string(),
            },
            AliasConfig {
                host: "A.example".to_string(),
                canister_id: "ryjl3-tyaaa-aaaaa-aaaba-cai".to_string(),
                domain: "ic0.app".to_string(),
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "domain.aliases[0].canister_id");
        assert_eq!(errors[1].field, "domain.aliases[1].host");
    }
}
