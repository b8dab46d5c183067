//! Unverified HTTP forwarding, for `/api/` traffic and foreign origins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use url::Url;

use crate::config::schema::TimeoutConfig;
use crate::gateway::error::FetchError;
use crate::gateway::transport::Fetcher;
use crate::gateway::types::{HeaderField, InboundRequest, OutboundResponse};
use crate::http::is_hop_by_hop;

/// [`Fetcher`] backed by a shared `reqwest` client.
///
/// Redirects are returned to the client rather than followed.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

/// Request headers worth forwarding upstream.
fn forwardable(name: &str) -> bool {
    !is_hop_by_hop(name)
        && !name.eq_ignore_ascii_case("host")
        && !name.eq_ignore_ascii_case("content-length")
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        request: &InboundRequest,
    ) -> Result<OutboundResponse, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::Method(request.method.clone()))?;

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in request.headers.iter().filter(|(name, _)| forwardable(name)) {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| FetchError::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: Vec<HeaderField> = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Upstream(e.to_string()))?;

        tracing::debug!(url = %url, status, bytes = body.len(), "Fetched upstream");
        Ok(OutboundResponse::new(status, headers, body))
    }
}
