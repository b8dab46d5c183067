//! Response handling and transformation.
//!
//! # Design Decisions
//! - Hop-by-hop headers and `Content-Length` are stripped; hyper computes the
//!   length of the buffered body
//! - Header pairs that are not valid HTTP are skipped with a warning

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode};

use crate::gateway::types::OutboundResponse;
use crate::http::is_hop_by_hop;

/// Convert a gateway response into an axum response.
pub fn into_response(response: OutboundResponse) -> Response<Body> {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        tracing::warn!(status = response.status, "Invalid status code, serving 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in &response.headers {
            if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            match (
                HeaderName::from_bytes(name.trim().as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid response header"),
            }
        }
    }

    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_copied_and_filtered() {
        let response = into_response(OutboundResponse::new(
            201,
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Set-Cookie".to_string(), "a=1".to_string()),
                ("Set-Cookie".to_string(), "b=2".to_string()),
                ("Connection".to_string(), "keep-alive".to_string()),
                ("Content-Length".to_string(), "999".to_string()),
                ("bad header".to_string(), "x".to_string()),
            ],
            "ok",
        ));

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
        assert!(response.headers().get("connection").is_none());
        assert!(response.headers().get("content-length").is_none());
        assert_eq!(response.headers().len(), 3);
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let response = into_response(OutboundResponse::text(42, "x"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
