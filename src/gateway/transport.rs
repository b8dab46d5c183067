//! Collaborator interfaces consumed by the gateway pipeline.
//!
//! The pipeline never talks to the network directly: RPC calls, certificate
//! checks and unverified fetches all go through these traits so each stage can
//! be exercised against in-memory doubles.

use std::sync::Arc;

use async_trait::async_trait;
use candid::Principal;
use url::Url;

use crate::gateway::error::{FetchError, TransportError};
use crate::gateway::types::{
    InboundRequest, OutboundResponse, RpcRequest, RpcResponse, StreamChunk, StreamingDescriptor,
};

/// RPC connection to one replica origin.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `http_request` with query semantics.
    async fn http_request(
        &self,
        canister_id: Principal,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError>;

    /// `http_request_update` with update (consensus) semantics.
    async fn http_request_update(
        &self,
        canister_id: Principal,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError>;

    /// Fetch the chunk behind `descriptor`.
    async fn stream_next(
        &self,
        canister_id: Principal,
        descriptor: StreamingDescriptor,
    ) -> Result<StreamChunk, TransportError>;

    /// Check a certificate against the trusted root key and return the data
    /// it certifies for `canister_id`.
    async fn certified_data(
        &self,
        canister_id: Principal,
        certificate: &[u8],
    ) -> Result<Vec<u8>, TransportError>;
}

/// Creates transports, one per request origin.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Connect to `origin`, bootstrapping trust first when configured.
    async fn connect(&self, origin: &Url) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Decides whether a body is certified for a path.
#[async_trait]
pub trait BodyVerifier: Send + Sync {
    async fn verify(
        &self,
        transport: &dyn Transport,
        canister_id: Principal,
        path: &str,
        body: &[u8],
        certificate: &[u8],
        tree: &[u8],
    ) -> bool;
}

/// Plain HTTP fetch, with no integrity claim.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send `request` to `url` and return whatever comes back.
    async fn fetch(
        &self,
        url: &Url,
        request: &InboundRequest,
    ) -> Result<OutboundResponse, FetchError>;
}
