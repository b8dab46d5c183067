//! Canister id resolution from hostnames, headers and query parameters.
//!
//! # Resolution order
//! ```text
//! local mode: referrer URL  (hostname, then ?canisterId=)
//!     → Host header         (port stripped, hostname only)
//!     → local mode: Referer header (full URL)
//!     → request URL         (hostname, then ?canisterId= in local mode)
//! ```
//!
//! A hostname only resolves if the labels to the right of the canister id
//! equal the gateway's own root domain. The query parameter is never honoured
//! outside local mode since it lets any URL pick any canister.

use std::collections::HashMap;

use candid::Principal;
use thiserror::Error;
use url::Url;

use crate::config::schema::DomainConfig;
use crate::gateway::types::InboundRequest;

/// Query parameter naming a canister in local mode.
pub const CANISTER_ID_PARAM: &str = "canisterId";

/// An alias entry whose canister id does not parse.
#[derive(Debug, Error)]
#[error("Alias '{host}' has an invalid canister id: {reason}")]
pub struct InvalidAlias {
    pub host: String,
    pub reason: String,
}

/// A fixed hostname mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub canister_id: Principal,
    pub domain: String,
}

/// Resolves the canister targeted by a request.
///
/// Immutable after construction; shared by every request.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    root_domain: String,
    aliases: HashMap<String, AliasEntry>,
    local_mode: bool,
}

impl DomainResolver {
    pub fn new(
        root_domain: impl Into<String>,
        aliases: HashMap<String, AliasEntry>,
        local_mode: bool,
    ) -> Self {
        Self {
            root_domain: root_domain.into(),
            aliases,
            local_mode,
        }
    }

    /// Build a resolver from validated configuration.
    pub fn from_config(config: &DomainConfig) -> Result<Self, InvalidAlias> {
        let mut aliases = HashMap::with_capacity(config.aliases.len());
        for alias in &config.aliases {
            let canister_id =
                Principal::from_text(&alias.canister_id).map_err(|e| InvalidAlias {
                    host: alias.host.clone(),
                    reason: e.to_string(),
                })?;
            aliases.insert(
                alias.host.to_ascii_lowercase(),
                AliasEntry {
                    canister_id,
                    domain: alias.domain.to_ascii_lowercase(),
                },
            );
        }

        Ok(Self::new(
            config.root.to_ascii_lowercase(),
            aliases,
            config.is_local_mode(),
        ))
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn is_local_mode(&self) -> bool {
        self.local_mode
    }

    /// Split a hostname at the right-most label that is a canister id.
    ///
    /// Returns the canister id and the labels to its right. Alias entries take
    /// precedence over the label scan.
    pub fn split_hostname(&self, hostname: &str) -> Option<(Principal, String)> {
        if let Some(alias) = self.aliases.get(hostname) {
            return Some((alias.canister_id, alias.domain.clone()));
        }

        let labels: Vec<&str> = hostname.split('.').collect();
        for (idx, label) in labels.iter().enumerate().rev() {
            if let Ok(canister_id) = Principal::from_text(label) {
                return Some((canister_id, labels[idx + 1..].join(".")));
            }
        }

        None
    }

    /// Resolve a hostname, accepting it only under the root domain.
    pub fn from_hostname(&self, hostname: &str) -> Option<Principal> {
        self.split_hostname(hostname)
            .filter(|(_, domain)| *domain == self.root_domain)
            .map(|(canister_id, _)| canister_id)
    }

    /// Resolve the `canisterId` query parameter (local mode only).
    pub fn from_query(&self, url: &Url) -> Option<Principal> {
        if !self.local_mode {
            return None;
        }

        url.query_pairs()
            .find(|(key, _)| key == CANISTER_ID_PARAM)
            .and_then(|(_, value)| Principal::from_text(value.as_ref()).ok())
    }

    /// Resolve from a URL string: hostname first, then query parameter.
    pub fn from_url(&self, url: &str) -> Option<Principal> {
        let url = Url::parse(url).ok()?;
        url.host_str()
            .and_then(|host| self.from_hostname(host))
            .or_else(|| self.from_query(&url))
    }

    /// Resolve from the `host` header, then (local mode) the `referer` header.
    pub fn from_headers(&self, request: &InboundRequest) -> Option<Principal> {
        let from_host = request
            .header("host")
            .map(|host| strip_port(host).to_ascii_lowercase())
            .and_then(|host| self.from_hostname(&host));

        from_host.or_else(|| {
            if !self.local_mode {
                return None;
            }
            request.header("referer").and_then(|referer| self.from_url(referer))
        })
    }

    /// Resolve the canister targeted by `request`, first match wins.
    pub fn resolve(&self, request: &InboundRequest) -> Option<Principal> {
        let from_referrer = if self.local_mode {
            request
                .referrer
                .as_deref()
                .and_then(|referrer| self.from_url(referrer))
        } else {
            None
        };

        from_referrer
            .or_else(|| self.from_headers(request))
            .or_else(|| self.from_url(request.url.as_str()))
    }
}

/// Remove a trailing `:<digits>` port.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
