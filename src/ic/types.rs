//! Candid types of the canister HTTP interface.

use candid::{CandidType, Deserialize, Nat};
use serde_bytes::ByteBuf;

pub type HeaderField = (String, String);

/// Argument of `http_request` and `http_request_update`.
#[derive(CandidType, Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<HeaderField>,
    pub body: ByteBuf,
}

/// Result of `http_request` and `http_request_update`.
#[derive(CandidType, Deserialize, Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Vec<HeaderField>,
    pub body: ByteBuf,
    pub streaming_strategy: Option<StreamingStrategy>,
    pub upgrade: Option<bool>,
}

candid::define_function!(pub CallbackFunc : (StreamingCallbackToken) -> (StreamingCallbackHttpResponse) query);

#[derive(CandidType, Deserialize, Debug)]
pub enum StreamingStrategy {
    Callback {
        callback: CallbackFunc,
        token: StreamingCallbackToken,
    },
}

/// Continuation token, in the shape served by asset canisters.
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub struct StreamingCallbackToken {
    pub key: String,
    pub content_encoding: String,
    pub index: Nat,
    pub sha256: Option<ByteBuf>,
}

/// Result of a streaming callback.
#[derive(CandidType, Deserialize, Debug)]
pub struct StreamingCallbackHttpResponse {
    pub body: ByteBuf,
    pub token: Option<StreamingCallbackToken>,
}
