//! Request handling and transformation.
//!
//! # Responsibilities
//! - Rebuild the absolute URL the client asked for
//! - Enforce the body size limit while buffering
//! - Project the axum request onto the gateway's `InboundRequest`
//!
//! # Design Decisions
//! - Absolute-form URIs are used as-is; otherwise the `Host` header and the
//!   configured public scheme supply the origin
//! - Non-UTF-8 header values are dropped, never lossily converted
//! - The host is client-controlled; passthrough fetches of it are limited by
//!   `security.passthrough_hosts`

use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use url::Url;

use crate::gateway::error::GatewayError;
use crate::gateway::types::{HeaderField, InboundRequest};

/// Buffer an axum request into an [`InboundRequest`].
pub async fn into_inbound(
    request: Request<Body>,
    public_scheme: &str,
    max_body_size: usize,
) -> Result<InboundRequest, GatewayError> {
    let (parts, body) = request.into_parts();
    let url = request_url(&parts.uri, &parts.headers, public_scheme)?;

    let headers: Vec<HeaderField> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let referrer = parts
        .headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = to_bytes(body, max_body_size)
        .await
        .map_err(|_| GatewayError::BodyTooLarge(max_body_size))?;

    Ok(InboundRequest {
        method: parts.method.as_str().to_string(),
        url,
        headers,
        referrer,
        body,
    })
}

fn request_url(
    uri: &axum::http::Uri,
    headers: &axum::http::HeaderMap,
    public_scheme: &str,
) -> Result<Url, GatewayError> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string())
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("missing Host header".to_string()))?;
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Url::parse(&format!("{}://{}{}", public_scheme, host, path))
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_url_from_host_header() {
        let request = Request::builder()
            .method("POST")
            .uri("/index.html?canisterId=abc")
            .header("host", "app.ic0.app")
            .header("referer", "https://ryjl3-tyaaa-aaaaa-aaaba-cai.ic0.app/")
            .body(Body::from("hello"))
            .unwrap();

        let inbound = into_inbound(request, "https", 1024).await.unwrap();

        assert_eq!(inbound.method, "POST");
        assert_eq!(
            inbound.url.as_str(),
            "https://app.ic0.app/index.html?canisterId=abc"
        );
        assert_eq!(
            inbound.referrer.as_deref(),
            Some("https://ryjl3-tyaaa-aaaaa-aaaba-cai.ic0.app/")
        );
        assert_eq!(inbound.header("Host"), Some("app.ic0.app"));
        assert_eq!(inbound.body, "hello");
    }

    #[tokio::test]
    async fn test_absolute_form_uri_wins() {
        let request = Request::builder()
            .uri("http://localhost:8000/x")
            .header("host", "ignored.example")
            .body(Body::empty())
            .unwrap();

        let inbound = into_inbound(request, "https", 1024).await.unwrap();
        assert_eq!(inbound.url.as_str(), "http://localhost:8000/x");
    }

    #[tokio::test]
    async fn test_missing_host_rejected() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let err = into_inbound(request, "https", 1024).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let request = Request::builder()
            .uri("/")
            .header("host", "a.ic0.app")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();

        let err = into_inbound(request, "https", 16).await.unwrap_err();
        assert_eq!(err.status(), 413);
    }
}
