//! Request matching predicates.
//!
//! # Design Decisions
//! - Path matching is case-sensitive prefix matching
//! - Host matching works on the lowercased URL host
//! - No regex, so every check is a linear scan of the input

use crate::gateway::types::InboundRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &InboundRequest) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        req.url.path().starts_with(&self.prefix)
    }
}

/// Matches hosts the gateway makes no integrity claim for.
///
/// That is any host outside the root domain, and the `raw.` subdomain of it.
/// The host comes from the client's `Host` header, so a match alone does not
/// make a fetch safe; the gateway applies `security.passthrough_hosts`.
#[derive(Debug, Clone)]
pub struct ForeignOriginMatcher {
    root_domain: String,
    raw_domain: String,
}

impl ForeignOriginMatcher {
    pub fn new(root_domain: impl Into<String>) -> Self {
        let root_domain = root_domain.into();
        Self {
            raw_domain: format!("raw.{}", root_domain),
            root_domain,
        }
    }
}

impl Matcher for ForeignOriginMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        let host = req.hostname();
        !host.ends_with(&self.root_domain) || host.ends_with(&self.raw_domain)
    }
}

/// Matches the `raw.` subdomain of the root domain, where responses are
/// served without certification.
#[derive(Debug, Clone)]
pub struct RawOriginMatcher {
    raw_domain: String,
}

impl RawOriginMatcher {
    pub fn new(root_domain: &str) -> Self {
        Self {
            raw_domain: format!("raw.{}", root_domain),
        }
    }
}

impl Matcher for RawOriginMatcher {
    fn matches(&self, req: &InboundRequest) -> bool {
        let host = req.hostname();
        host == self.raw_domain || host.ends_with(&format!(".{}", self.raw_domain))
    }
}
