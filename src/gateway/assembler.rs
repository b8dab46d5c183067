//! Outbound response construction.

use crate::gateway::certificate::{CertificateMaterial, CERTIFICATE_HEADER};
use crate::gateway::error::{GatewayResult, TransportError};
use crate::gateway::types::{HeaderField, OutboundResponse};

/// Media type forced on `/api/` responses.
pub const CBOR_CONTENT_TYPE: &str = "application/cbor";

/// Canister response headers, sorted by what the gateway does with them.
#[derive(Debug, Default)]
pub struct CanisterHeaders {
    /// Headers passed on to the client.
    pub headers: Vec<HeaderField>,
    /// Parsed `IC-Certificate` material.
    pub material: CertificateMaterial,
    /// Last `Content-Encoding` token, trimmed.
    pub encoding: String,
}

impl CanisterHeaders {
    /// Split canister headers.
    ///
    /// `IC-Certificate` is consumed. `Content-Encoding` and `Content-Length`
    /// describe the raw body and are dropped, since the decoded body is served.
    pub fn split(headers: Vec<HeaderField>) -> Self {
        headers
            .into_iter()
            .fold(Self::default(), |mut parts, (name, value)| {
                match name.trim().to_ascii_lowercase().as_str() {
                    CERTIFICATE_HEADER => {
                        parts.material = std::mem::take(&mut parts.material).merge_header(&value);
                    }
                    "content-encoding" => parts.encoding = value.trim().to_string(),
                    "content-length" => {}
                    _ => parts.headers.push((name, value)),
                }
                parts
            })
    }
}

/// Final response for a verified canister reply.
pub fn assemble(
    status_code: u16,
    headers: Vec<HeaderField>,
    body: Vec<u8>,
) -> GatewayResult<OutboundResponse> {
    if !(100..=999).contains(&status_code) {
        return Err(TransportError::Decode(format!("invalid status code {}", status_code)).into());
    }
    Ok(OutboundResponse::new(status_code, headers, body))
}

/// Force `/api/` responses to be treated as opaque CBOR by the client.
pub fn sanitize_api_response(response: OutboundResponse) -> OutboundResponse {
    let mut headers: Vec<HeaderField> = response
        .headers
        .into_iter()
        .filter(|(name, _)| {
            !name.eq_ignore_ascii_case("content-type")
                && !name.eq_ignore_ascii_case("x-content-type-options")
        })
        .collect();
    headers.push(("X-Content-Type-Options".to_string(), "nosniff".to_string()));
    headers.push(("Content-Type".to_string(), CBOR_CONTENT_TYPE.to_string()));

    OutboundResponse::new(response.status, headers, response.body)
}
