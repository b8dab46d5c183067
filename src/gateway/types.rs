//! Request and response projections flowing through the pipeline.
//!
//! Each stage consumes the previous stage's value and produces a new one;
//! nothing here is mutated in place once built.

use bytes::Bytes;
use url::Url;

/// A single `(name, value)` header pair. Order and duplicates are preserved.
pub type HeaderField = (String, String);

/// Header injected when the client did not state its own preference.
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, identity";

/// Find the first header with the given name (case-insensitive).
pub fn find_header<'a>(headers: &'a [HeaderField], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// A request as received from the HTTP client.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<HeaderField>,
    /// Referrer of the request, when the client sent one.
    pub referrer: Option<String>,
    pub body: Bytes,
}

impl InboundRequest {
    /// First value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Host part of the request URL, empty if the URL has none.
    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Path plus query string, as sent to the canister.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", self.url.path(), query),
            _ => self.url.path().to_string(),
        }
    }
}

/// The `http_request` argument sent to a canister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<HeaderField>,
    pub body: Vec<u8>,
}

impl RpcRequest {
    /// Project an inbound request, adding `Accept-Encoding` when it is absent.
    pub fn from_inbound(request: &InboundRequest) -> Self {
        let mut headers = request.headers.clone();
        if request.header("accept-encoding").is_none() {
            headers.push((
                "Accept-Encoding".to_string(),
                DEFAULT_ACCEPT_ENCODING.to_string(),
            ));
        }

        Self {
            method: request.method.clone(),
            url: request.path_and_query(),
            headers,
            body: request.body.to_vec(),
        }
    }
}

/// Continuation for a body delivered over several calls.
///
/// The token is already encoded by the transport; the gateway only moves it
/// back to the transport, once.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamingDescriptor {
    /// Canister method answering continuation calls.
    pub method: String,
    /// Opaque encoded continuation token.
    pub token: Vec<u8>,
}

/// Decoded `http_request` / `http_request_update` result.
#[derive(Debug)]
pub struct RpcResponse {
    pub status_code: u16,
    pub headers: Vec<HeaderField>,
    /// Whole body, or the first chunk when `streaming` is set.
    pub body: Vec<u8>,
    pub streaming: Option<StreamingDescriptor>,
    /// The canister asks for the request to be repeated as an update call.
    pub upgrade: bool,
}

impl RpcResponse {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }
}

/// One continuation chunk and the descriptor for the next one, if any.
#[derive(Debug)]
pub struct StreamChunk {
    pub body: Vec<u8>,
    pub next: Option<StreamingDescriptor>,
}

/// Response handed back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: Vec<HeaderField>,
    pub body: Bytes,
}

impl OutboundResponse {
    pub fn new(status: u16, headers: Vec<HeaderField>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A plain-text response with no extra headers.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, Vec::new(), body.into())
    }

    /// A response without a body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new(), Bytes::new())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}
