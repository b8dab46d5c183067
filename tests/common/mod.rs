//! Shared doubles for the integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use candid::Principal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use canister_gateway::config::GatewayConfig;
use canister_gateway::gateway::error::{FetchError, TransportError};
use canister_gateway::gateway::transport::{BodyVerifier, Fetcher, Transport, TransportFactory};
use canister_gateway::gateway::types::{
    HeaderField, InboundRequest, OutboundResponse, RpcRequest, RpcResponse, StreamChunk,
    StreamingDescriptor,
};
use canister_gateway::{Gateway, HttpServer};

pub const LEDGER: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

pub fn ledger() -> Principal {
    Principal::from_text(LEDGER).unwrap()
}

/// `IC-Certificate` header value carrying placeholder material.
pub fn certificate_header() -> String {
    format!(
        "certificate=:{}:, tree=:{}:",
        STANDARD.encode(b"certificate"),
        STANDARD.encode(b"tree")
    )
}

/// A canister reply the mock replays for every call of one kind.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<HeaderField>,
    pub body: Vec<u8>,
    /// Bodies of the continuation chunks, in order.
    pub chunks: Vec<Vec<u8>>,
    pub upgrade: bool,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn certified(self) -> Self {
        let value = certificate_header();
        self.header("IC-Certificate", &value)
    }

    pub fn chunks(mut self, chunks: &[&[u8]]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_vec()).collect();
        self
    }

    pub fn upgrade(mut self) -> Self {
        self.upgrade = true;
        self
    }

    fn descriptor(index: usize) -> StreamingDescriptor {
        StreamingDescriptor {
            method: "http_request_streaming_callback".to_string(),
            token: index.to_be_bytes().to_vec(),
        }
    }

    fn to_rpc(&self) -> RpcResponse {
        RpcResponse {
            status_code: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            streaming: (!self.chunks.is_empty()).then(|| Self::descriptor(0)),
            upgrade: self.upgrade,
        }
    }
}

/// Records every call the gateway makes.
#[derive(Debug, Default)]
pub struct CallLog {
    pub calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

/// In-memory canister.
#[derive(Debug)]
pub struct MockTransport {
    pub query: Reply,
    pub update: Option<Reply>,
    pub log: Arc<CallLog>,
}

impl MockTransport {
    fn chunks(&self, upgraded: bool) -> &[Vec<u8>] {
        match (&self.update, upgraded) {
            (Some(update), true) => &update.chunks,
            _ => &self.query.chunks,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn http_request(
        &self,
        canister_id: Principal,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        self.log
            .push(format!("query {} {} {}", canister_id, request.method, request.url));
        Ok(self.query.to_rpc())
    }

    async fn http_request_update(
        &self,
        canister_id: Principal,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        self.log
            .push(format!("update {} {} {}", canister_id, request.method, request.url));
        self.update
            .as_ref()
            .map(Reply::to_rpc)
            .ok_or_else(|| TransportError::Agent("update not scripted".to_string()))
    }

    async fn stream_next(
        &self,
        canister_id: Principal,
        descriptor: StreamingDescriptor,
    ) -> Result<StreamChunk, TransportError> {
        let index = usize::from_be_bytes(
            descriptor
                .token
                .as_slice()
                .try_into()
                .map_err(|_| TransportError::Decode("bad token".to_string()))?,
        );
        self.log.push(format!("stream {} {}", canister_id, index));

        let chunks = self.chunks(self.update.is_some());
        let body = chunks
            .get(index)
            .cloned()
            .ok_or_else(|| TransportError::Agent("no such chunk".to_string()))?;
        let next = (index + 1 < chunks.len()).then(|| Reply::descriptor(index + 1));

        Ok(StreamChunk { body, next })
    }

    async fn certified_data(
        &self,
        _canister_id: Principal,
        _certificate: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        Ok(Vec::new())
    }
}

/// Hands out one shared [`MockTransport`] and records requested origins.
pub struct MockFactory {
    pub transport: Arc<MockTransport>,
    pub origins: Mutex<Vec<Url>>,
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn connect(&self, origin: &Url) -> Result<Arc<dyn Transport>, TransportError> {
        self.origins.lock().unwrap().push(origin.clone());
        Ok(self.transport.clone())
    }
}

/// Accepts exactly one body and records which bodies it was shown.
#[derive(Debug, Default)]
pub struct MockVerifier {
    pub accepts: Option<Vec<u8>>,
    pub seen: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl BodyVerifier for MockVerifier {
    async fn verify(
        &self,
        _transport: &dyn Transport,
        _canister_id: Principal,
        _path: &str,
        body: &[u8],
        _certificate: &[u8],
        _tree: &[u8],
    ) -> bool {
        self.seen.lock().unwrap().push(body.to_vec());
        self.accepts.as_deref() == Some(body)
    }
}

/// Answers every fetch with the same response and records the targets.
#[derive(Debug)]
pub struct MockFetcher {
    pub response: OutboundResponse,
    pub urls: Mutex<Vec<Url>>,
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _request: &InboundRequest,
    ) -> Result<OutboundResponse, FetchError> {
        self.urls.lock().unwrap().push(url.clone());
        Ok(self.response.clone())
    }
}

/// A gateway wired to doubles, plus handles on them.
pub struct Harness {
    pub server: HttpServer,
    pub log: Arc<CallLog>,
    pub factory: Arc<MockFactory>,
    pub verifier: Arc<MockVerifier>,
    pub fetcher: Arc<MockFetcher>,
}

impl Harness {
    pub fn new(query: Reply, update: Option<Reply>, accepts: Option<&[u8]>) -> Self {
        Self::with_config(GatewayConfig::default(), query, update, accepts)
    }

    pub fn with_config(
        config: GatewayConfig,
        query: Reply,
        update: Option<Reply>,
        accepts: Option<&[u8]>,
    ) -> Self {
        let log = Arc::new(CallLog::default());
        let factory = Arc::new(MockFactory {
            transport: Arc::new(MockTransport {
                query,
                update,
                log: log.clone(),
            }),
            origins: Mutex::new(Vec::new()),
        });
        let verifier = Arc::new(MockVerifier {
            accepts: accepts.map(<[u8]>::to_vec),
            seen: Mutex::new(Vec::new()),
        });
        let fetcher = Arc::new(MockFetcher {
            response: OutboundResponse::new(
                200,
                vec![("Content-Type".to_string(), "text/html".to_string())],
                "upstream",
            ),
            urls: Mutex::new(Vec::new()),
        });

        let gateway = Gateway::from_config(
            &config,
            factory.clone(),
            verifier.clone(),
            fetcher.clone(),
        )
        .unwrap();
        let server = HttpServer::new(Arc::new(gateway), &config);

        Self {
            server,
            log,
            factory,
            verifier,
            fetcher,
        }
    }
}

/// GET request as a browser would send it to `host`.
pub fn get(host: &str, path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("host", host)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Start a raw TCP backend that answers every connection with `status` and
/// `body`, and reports the request head it received.
pub async fn start_mock_backend(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, tokio::sync::mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    (addr, rx)
}
