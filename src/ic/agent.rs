//! `ic-agent` backed transport.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use candid::Principal;
use ic_agent::hash_tree::LookupResult;
use ic_agent::{Agent, AgentError, Certificate};
use serde_bytes::ByteBuf;
use url::Url;

use crate::gateway::error::TransportError;
use crate::gateway::transport::{Transport, TransportFactory};
use crate::gateway::types::{RpcRequest, RpcResponse, StreamChunk, StreamingDescriptor};
use crate::ic::types::{
    CallbackFunc, HttpRequest, HttpResponse, StreamingCallbackHttpResponse,
    StreamingCallbackToken, StreamingStrategy,
};

const HTTP_REQUEST: &str = "http_request";
const HTTP_REQUEST_UPDATE: &str = "http_request_update";

impl From<AgentError> for TransportError {
    fn from(err: AgentError) -> Self {
        TransportError::Agent(err.to_string())
    }
}

impl From<candid::Error> for TransportError {
    fn from(err: candid::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Creates one [`AgentTransport`] per replica origin.
#[derive(Debug, Clone)]
pub struct AgentTransportFactory {
    fetch_root_key: bool,
    max_certificate_age: Duration,
}

impl AgentTransportFactory {
    /// `fetch_root_key` trusts whatever root key the replica reports; only
    /// for development networks.
    pub fn new(fetch_root_key: bool, max_certificate_age: Duration) -> Self {
        Self {
            fetch_root_key,
            max_certificate_age,
        }
    }
}

#[async_trait]
impl TransportFactory for AgentTransportFactory {
    async fn connect(&self, origin: &Url) -> Result<Arc<dyn Transport>, TransportError> {
        let agent = Agent::builder()
            .with_url(origin.as_str())
            .build()
            .map_err(|e| TransportError::InvalidOrigin(format!("{}: {}", origin, e)))?;

        if self.fetch_root_key {
            tracing::debug!(origin = %origin, "Fetching root key");
            agent.fetch_root_key().await?;
        }

        Ok(Arc::new(AgentTransport {
            agent,
            max_certificate_age: self.max_certificate_age,
        }))
    }
}

/// Transport speaking the canister HTTP interface through an [`Agent`].
pub struct AgentTransport {
    agent: Agent,
    max_certificate_age: Duration,
}

impl AgentTransport {
    fn encode_request(request: &RpcRequest) -> Result<Vec<u8>, TransportError> {
        let arg = HttpRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: ByteBuf::from(request.body.clone()),
        };
        Ok(candid::encode_one(arg)?)
    }

    fn decode_response(
        canister_id: Principal,
        bytes: &[u8],
    ) -> Result<RpcResponse, TransportError> {
        let response: HttpResponse = candid::decode_one(bytes)?;

        let streaming = match response.streaming_strategy {
            Some(StreamingStrategy::Callback {
                callback: CallbackFunc(callback),
                token,
            }) => {
                if callback.principal != canister_id {
                    tracing::debug!(
                        canister_id = %canister_id,
                        callback = %callback.principal,
                        "Streaming callback names another canister; calling the resolved one"
                    );
                }
                Some(StreamingDescriptor {
                    method: callback.method,
                    token: candid::encode_one(token)?,
                })
            }
            None => None,
        };

        Ok(RpcResponse {
            status_code: response.status_code,
            headers: response.headers,
            body: response.body.into_vec(),
            streaming,
            upgrade: response.upgrade.unwrap_or(false),
        })
    }

    /// Check the certificate's `time` against the local clock.
    fn check_freshness(&self, certificate: &Certificate) -> Result<(), TransportError> {
        let time = match certificate.tree.lookup_path([b"time".as_slice()]) {
            LookupResult::Found(bytes) => decode_leb128(bytes),
            _ => None,
        }
        .ok_or_else(|| TransportError::Certificate("missing time".to_string()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let skew = now.abs_diff(u128::from(time));

        if skew > self.max_certificate_age.as_nanos() {
            return Err(TransportError::Certificate(format!(
                "certificate time is {}s away from local time",
                skew / 1_000_000_000
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for AgentTransport {
    async fn http_request(
        &self,
        canister_id: Principal,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        let bytes = self
            .agent
            .query(&canister_id, HTTP_REQUEST)
            .with_arg(Self::encode_request(request)?)
            .call()
            .await?;
        Self::decode_response(canister_id, &bytes)
    }

    async fn http_request_update(
        &self,
        canister_id: Principal,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        let bytes = self
            .agent
            .update(&canister_id, HTTP_REQUEST_UPDATE)
            .with_arg(Self::encode_request(request)?)
            .call_and_wait()
            .await?;
        Self::decode_response(canister_id, &bytes)
    }

    async fn stream_next(
        &self,
        canister_id: Principal,
        descriptor: StreamingDescriptor,
    ) -> Result<StreamChunk, TransportError> {
        let StreamingDescriptor { method, token } = descriptor;

        let bytes = self
            .agent
            .query(&canister_id, method.as_str())
            .with_arg(token)
            .call()
            .await?;
        let response: StreamingCallbackHttpResponse = candid::decode_one(&bytes)?;

        let next = response
            .token
            .map(|token: StreamingCallbackToken| candid::encode_one(token))
            .transpose()?
            .map(|token| StreamingDescriptor { method, token });

        Ok(StreamChunk {
            body: response.body.into_vec(),
            next,
        })
    }

    async fn certified_data(
        &self,
        canister_id: Principal,
        certificate: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        let certificate: Certificate = serde_cbor::from_slice(certificate)
            .map_err(|e| TransportError::Certificate(e.to_string()))?;

        self.agent
            .verify(&certificate, canister_id)
            .map_err(|e| TransportError::Certificate(e.to_string()))?;
        self.check_freshness(&certificate)?;

        match certificate.tree.lookup_path([
            b"canister".as_slice(),
            canister_id.as_slice(),
            b"certified_data".as_slice(),
        ]) {
            LookupResult::Found(data) => Ok(data.to_vec()),
            _ => Err(TransportError::Certificate(
                "no certified data for canister".to_string(),
            )),
        }
    }
}

/// Unsigned LEB128, as used for the certificate `time` leaf.
fn decode_leb128(bytes: &[u8]) -> Option<u64> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate() {
        let shift = u32::try_from(i * 7).ok().filter(|s| *s < 64)?;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use candid::{Func, Nat};

    #[test]
    fn test_decode_leb128() {
        assert_eq!(decode_leb128(&[0x00]), Some(0));
        assert_eq!(decode_leb128(&[0xe5, 0x8e, 0x26]), Some(624_485));
        assert_eq!(decode_leb128(&[0x80]), None);
        assert_eq!(decode_leb128(&[]), None);
    }

    #[test]
    fn test_decode_response_with_streaming() {
        let canister_id = Principal::from_text("ryjl3-tyaaa-aaaaa-aaaba-cai").unwrap();
        let token = StreamingCallbackToken {
            key: "/video.mp4".to_string(),
            content_encoding: "identity".to_string(),
            index: Nat::from(1u64),
            sha256: None,
        };
        let response = HttpResponse {
            status_code: 200,
            headers: vec![("content-type".to_string(), "video/mp4".to_string())],
            body: ByteBuf::from(b"first".to_vec()),
            streaming_strategy: Some(StreamingStrategy::Callback {
                callback: CallbackFunc(Func {
                    principal: canister_id,
                    method: "http_request_streaming_callback".to_string(),
                }),
                token: token.clone(),
            }),
            upgrade: None,
        };
        let bytes = candid::encode_one(response).unwrap();

        let decoded = AgentTransport::decode_response(canister_id, &bytes).unwrap();
        let descriptor = decoded.streaming.unwrap();

        assert_eq!(decoded.body, b"first");
        assert!(!decoded.upgrade);
        assert_eq!(descriptor.method, "http_request_streaming_callback");
        assert_eq!(
            candid::decode_one::<StreamingCallbackToken>(&descriptor.token).unwrap(),
            token
        );
    }

    #[test]
    fn test_decode_plain_response() {
        let canister_id = Principal::from_text("ryjl3-tyaaa-aaaaa-aaaba-cai").unwrap();
        let response = HttpResponse {
            status_code: 200,
            headers: vec![],
            body: ByteBuf::from(b"hello".to_vec()),
            streaming_strategy: None,
            upgrade: None,
        };
        let bytes = candid::encode_one(response).unwrap();

        let decoded = AgentTransport::decode_response(canister_id, &bytes).unwrap();

        assert_eq!(decoded.status_code, 200);
        assert_eq!(decoded.body, b"hello");
        assert!(decoded.streaming.is_none());
        assert!(!decoded.upgrade);
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let canister_id = Principal::from_text("ryjl3-tyaaa-aaaaa-aaaba-cai").unwrap();
        let err = AgentTransport::decode_response(canister_id, b"not candid").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_encode_request_roundtrips_fields() {
        #[derive(candid::CandidType, candid::Deserialize)]
        struct Echo {
            method: String,
            url: String,
            headers: Vec<(String, String)>,
            body: ByteBuf,
        }

        let request = RpcRequest {
            method: "POST".to_string(),
            url: "/submit?x=1".to_string(),
            headers: vec![("accept-encoding".to_string(), "gzip".to_string())],
            body: b"payload".to_vec(),
        };
        let bytes = AgentTransport::encode_request(&request).unwrap();
        let echo: Echo = candid::decode_one(&bytes).unwrap();

        assert_eq!(echo.method, "POST");
        assert_eq!(echo.url, "/submit?x=1");
        assert_eq!(echo.headers, request.headers);
        assert_eq!(echo.body.into_vec(), b"payload");
    }
}
