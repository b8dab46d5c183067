//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, access spans)
//!     → request.rs (absolute URL, body limit, InboundRequest)
//!     → [gateway pipeline]
//!     → response.rs (OutboundResponse → axum Response)
//!     → Send to client
//!
//! passthrough.rs: reqwest-backed Fetcher for /api/ and foreign origins
//! ```

pub mod passthrough;
pub mod request;
pub mod response;
pub mod server;

pub use passthrough::HttpFetcher;
pub use server::HttpServer;

/// Header carrying the per-request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Connection-scoped headers that must not be forwarded (RFC 9110 §7.6.1).
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}
