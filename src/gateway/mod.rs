//! Canister gateway core.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → routing (api / reserved / canister / passthrough / unresolved)
//!     → identity.rs      (canister id from host, referrer, query)
//!     → orchestrator.rs  (query call, one optional update call)
//!     → streaming.rs     (remaining chunks, in order)
//!     → codec.rs         (content decoding)
//!     → verification.rs  (certificate gate, raw body then decoded body)
//!     → assembler.rs     (OutboundResponse)
//! ```
//!
//! # Design Decisions
//! - The canister id is resolved once and used for every call of a request
//! - Every failure becomes an `OutboundResponse`; nothing escapes as a fault
//! - Network access only through the traits in `transport.rs`
//! - RPC and `/api/` traffic never targets the inbound origin, which would
//!   route it back into this gateway
//! - Foreign-origin passthrough trusts the client's `Host` header; restrict it
//!   with `security.passthrough_hosts` when the gateway is reachable publicly

pub mod assembler;
pub mod certificate;
pub mod codec;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod streaming;
pub mod transport;
pub mod types;
pub mod verification;

use std::sync::Arc;
use std::time::Instant;

use candid::Principal;
use url::Url;

use crate::config::GatewayConfig;
use crate::gateway::assembler::CanisterHeaders;
use crate::gateway::error::{FetchError, GatewayError, GatewayResult, TransportError};
use crate::gateway::identity::{DomainResolver, InvalidAlias};
use crate::gateway::orchestrator::Forwarded;
use crate::gateway::transport::{BodyVerifier, Fetcher, TransportFactory};
use crate::gateway::types::{InboundRequest, OutboundResponse, RpcRequest};
use crate::gateway::verification::{VerificationGate, VerificationInput};
use crate::observability::metrics;
use crate::routing::{Route, Router};

/// The request pipeline with its collaborators.
///
/// Built once at startup and shared by every request; holds no mutable state.
pub struct Gateway {
    router: Router,
    transports: Arc<dyn TransportFactory>,
    gate: VerificationGate,
    fetcher: Arc<dyn Fetcher>,
    replica_url: Option<Url>,
    passthrough_hosts: Vec<String>,
}

impl Gateway {
    pub fn new(
        resolver: DomainResolver,
        transports: Arc<dyn TransportFactory>,
        verifier: Arc<dyn BodyVerifier>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            router: Router::new(Arc::new(resolver)),
            transports,
            gate: VerificationGate::new(verifier),
            fetcher,
            replica_url: None,
            passthrough_hosts: Vec::new(),
        }
    }

    /// Send every RPC and `/api/` request to `url` instead of the origin
    /// derived from the request host.
    pub fn with_replica_url(mut self, url: Option<Url>) -> Self {
        self.replica_url = url;
        self
    }

    /// Restrict foreign-origin passthrough to these hosts and their
    /// subdomains. Empty allows any host.
    pub fn with_passthrough_hosts(mut self, hosts: Vec<String>) -> Self {
        self.passthrough_hosts = hosts
            .into_iter()
            .map(|host| host.trim().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Build a gateway from validated configuration.
    pub fn from_config(
        config: &GatewayConfig,
        transports: Arc<dyn TransportFactory>,
        verifier: Arc<dyn BodyVerifier>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, InvalidAlias> {
        let resolver = DomainResolver::from_config(&config.domain)?;
        let replica_url = config.replica_url().and_then(|url| Url::parse(url).ok());

        Ok(Self::new(resolver, transports, verifier, fetcher)
            .with_replica_url(replica_url)
            .with_passthrough_hosts(config.security.passthrough_hosts.clone()))
    }

    pub fn resolver(&self) -> &DomainResolver {
        self.router.resolver()
    }

    /// Handle one request. Never fails: errors become error responses.
    pub async fn handle(&self, request: InboundRequest) -> OutboundResponse {
        let start = Instant::now();
        let route = self.router.route(&request);

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            route = route.name(),
            "Routing request"
        );

        let result = match route {
            Route::Api => self.forward_api(&request).await,
            Route::Reserved => Err(GatewayError::ReservedPath),
            Route::Canister(canister_id) => self.serve_canister(canister_id, &request).await,
            Route::Passthrough => self.passthrough(&request).await,
            Route::Unresolved => {
                tracing::error!(url = %request.url, "URL did not resolve to a canister ID");
                Err(GatewayError::UnresolvedIdentity)
            }
        };

        let response = result.unwrap_or_else(|err| {
            match &err {
                GatewayError::RedirectRefused
                | GatewayError::VerificationFailed
                | GatewayError::UnresolvedIdentity
                | GatewayError::ReservedPath => {}
                other => {
                    tracing::error!(url = %request.url, error = %other, "Failed to fetch response")
                }
            }
            metrics::record_error(err.kind());
            err.into_response()
        });

        metrics::record_request(route.name(), response.status, start);
        response
    }

    /// Query, upgrade, reassemble, decode and verify.
    async fn serve_canister(
        &self,
        canister_id: Principal,
        request: &InboundRequest,
    ) -> GatewayResult<OutboundResponse> {
        let origin = self.replica_origin(&request.url)?;
        let transport = self.transports.connect(&origin).await?;

        let rpc_request = RpcRequest::from_inbound(request);
        let Forwarded { response, upgraded } =
            orchestrator::forward(transport.as_ref(), canister_id, &rpc_request).await?;

        let CanisterHeaders {
            headers,
            material,
            encoding,
        } = CanisterHeaders::split(response.headers);

        let raw_body = streaming::reassemble(
            transport.as_ref(),
            canister_id,
            response.body,
            response.streaming,
        )
        .await?;
        let decoded_body = codec::decode_body(&raw_body, &encoding)?;

        let outcome = self
            .gate
            .accept(
                transport.as_ref(),
                VerificationInput {
                    canister_id,
                    path: request.url.path(),
                    raw_body: &raw_body,
                    decoded_body: &decoded_body,
                    material: &material,
                    upgraded,
                },
            )
            .await;

        if !outcome.is_accepted() {
            tracing::error!(
                canister_id = %canister_id,
                path = %request.url.path(),
                outcome = outcome.as_str(),
                "Body does not pass verification"
            );
            return Err(GatewayError::VerificationFailed);
        }

        tracing::debug!(
            canister_id = %canister_id,
            status = response.status_code,
            outcome = outcome.as_str(),
            bytes = decoded_body.len(),
            "Serving verified response"
        );

        assembler::assemble(response.status_code, headers, decoded_body)
    }

    /// Forward `/api/` traffic to the replica, tagged as opaque CBOR.
    async fn forward_api(&self, request: &InboundRequest) -> GatewayResult<OutboundResponse> {
        let origin = self.replica_origin(&request.url)?;
        let target = origin
            .join(&request.path_and_query())
            .map_err(|_| TransportError::InvalidOrigin(origin.to_string()))?;

        let response = self.fetcher.fetch(&target, request).await?;
        Ok(assembler::sanitize_api_response(response))
    }

    /// Fetch a foreign or raw origin without verification.
    async fn passthrough(&self, request: &InboundRequest) -> GatewayResult<OutboundResponse> {
        let host = request.hostname();
        if !self.passthrough_allowed(host) {
            tracing::warn!(url = %request.url, "Passthrough host not allowed");
            return Err(FetchError::HostNotAllowed(host.to_string()).into());
        }

        tracing::info!(url = %request.url, "Direct call");
        Ok(self.fetcher.fetch(&request.url, request).await?)
    }

    /// Hosts under the root domain (the `raw.` subdomain) are always allowed.
    fn passthrough_allowed(&self, host: &str) -> bool {
        if self.passthrough_hosts.is_empty() {
            return true;
        }
        let root = self.resolver().root_domain();
        std::iter::once(root)
            .chain(self.passthrough_hosts.iter().map(String::as_str))
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// Replica origin for a request.
    ///
    /// The configured replica when set, otherwise `<scheme>://<suffix>` when
    /// the host splits into a canister id and a suffix, else
    /// `<scheme>://<root>`. Never the request's own origin.
    fn replica_origin(&self, url: &Url) -> Result<Url, TransportError> {
        if let Some(replica_url) = &self.replica_url {
            return Ok(replica_url.clone());
        }

        let domain = url
            .host_str()
            .and_then(|host| self.resolver().split_hostname(host))
            .map(|(_, domain)| domain)
            .unwrap_or_else(|| self.resolver().root_domain().to_string());

        let origin = format!("{}://{}", url.scheme(), domain);
        let parsed = Url::parse(&origin).map_err(|_| TransportError::InvalidOrigin(origin))?;
        if parsed.origin() == url.origin() {
            return Err(TransportError::InvalidOrigin(format!(
                "'{}' is this gateway",
                parsed
            )));
        }
        Ok(parsed)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("root_domain", &self.resolver().root_domain())
            .field("local_mode", &self.resolver().is_local_mode())
            .field("replica_url", &self.replica_url)
            .field("passthrough_hosts", &self.passthrough_hosts)
            .finish()
    }
}
