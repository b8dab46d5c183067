//! Request classification.
//!
//! # Responsibilities
//! - Send `/api/` traffic straight to the replica
//! - Refuse the reserved `/_/` namespace
//! - Resolve the canister behind everything else
//! - Decide whether an unresolved request may leave unverified

use std::sync::Arc;

use candid::Principal;

use crate::gateway::identity::DomainResolver;
use crate::gateway::types::InboundRequest;
use crate::routing::matcher::{ForeignOriginMatcher, Matcher, PathPrefixMatcher, RawOriginMatcher};

/// Path prefix of the replica's own RPC-over-HTTP API.
pub const API_PREFIX: &str = "/api/";

/// Path prefix reserved for the gateway.
pub const RESERVED_PREFIX: &str = "/_/";

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Forward to the replica API unchanged.
    Api,
    /// Reserved namespace, always 404.
    Reserved,
    /// Serve from this canister, with verification.
    Canister(Principal),
    /// Foreign or raw origin, fetched without verification.
    Passthrough,
    /// Same-origin request naming no canister.
    Unresolved,
}

impl Route {
    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Api => "api",
            Route::Reserved => "reserved",
            Route::Canister(_) => "canister",
            Route::Passthrough => "passthrough",
            Route::Unresolved => "unresolved",
        }
    }
}

/// Immutable request classifier.
#[derive(Debug)]
pub struct Router {
    api: PathPrefixMatcher,
    reserved: PathPrefixMatcher,
    raw: RawOriginMatcher,
    foreign: ForeignOriginMatcher,
    resolver: Arc<DomainResolver>,
}

impl Router {
    pub fn new(resolver: Arc<DomainResolver>) -> Self {
        Self {
            api: PathPrefixMatcher::new(API_PREFIX),
            reserved: PathPrefixMatcher::new(RESERVED_PREFIX),
            raw: RawOriginMatcher::new(resolver.root_domain()),
            foreign: ForeignOriginMatcher::new(resolver.root_domain()),
            resolver,
        }
    }

    pub fn resolver(&self) -> &DomainResolver {
        &self.resolver
    }

    /// Classify a request. First match wins.
    pub fn route(&self, req: &InboundRequest) -> Route {
        if self.api.matches(req) {
            return Route::Api;
        }
        if self.reserved.matches(req) {
            return Route::Reserved;
        }
        if self.raw.matches(req) {
            return Route::Passthrough;
        }
        if let Some(canister_id) = self.resolver.resolve(req) {
            return Route::Canister(canister_id);
        }
        if self.foreign.matches(req) {
            return Route::Passthrough;
        }
        Route::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;
    use url::Url;

    const LEDGER: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

    fn router() -> Router {
        Router::new(Arc::new(DomainResolver::new("ic0.app", HashMap::new(), false)))
    }

    fn request(url: &str) -> InboundRequest {
        InboundRequest {
            method: "GET".into(),
            url: Url::parse(url).unwrap(),
            headers: vec![],
            referrer: None,
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_api_wins_over_canister() {
        let url = format!("https://{}.ic0.app/api/v2/status", LEDGER);
        assert_eq!(router().route(&request(&url)), Route::Api);
    }

    #[test]
    fn test_reserved_prefix() {
        let url = format!("https://{}.ic0.app/_/raw", LEDGER);
        assert_eq!(router().route(&request(&url)), Route::Reserved);
    }

    #[test]
    fn test_canister_route() {
        let url = format!("https://{}.ic0.app/index.html", LEDGER);
        assert_eq!(
            router().route(&request(&url)),
            Route::Canister(Principal::from_text(LEDGER).unwrap())
        );
    }

    #[test]
    fn test_raw_subdomain_passthrough() {
        let url = format!("https://{}.raw.ic0.app/index.html", LEDGER);
        assert_eq!(router().route(&request(&url)), Route::Passthrough);
    }

    #[test]
    fn test_raw_passthrough_even_when_resolvable() {
        let router = Router::new(Arc::new(DomainResolver::new(
            "localhost",
            HashMap::new(),
            true,
        )));
        let url = format!("http://raw.localhost/?canisterId={}", LEDGER);
        assert_eq!(router.route(&request(&url)), Route::Passthrough);
    }

    #[test]
    fn test_foreign_passthrough() {
        assert_eq!(
            router().route(&request("https://fonts.example.com/a.woff")),
            Route::Passthrough
        );
    }

    #[test]
    fn test_same_origin_unresolved() {
        assert_eq!(
            router().route(&request("https://www.ic0.app/")),
            Route::Unresolved
        );
    }
}
