//! Gateway error taxonomy and its HTTP mapping.

use thiserror::Error;

use crate::gateway::codec::CodecError;
use crate::gateway::types::OutboundResponse;

/// Body served when a canister answers with a redirect.
pub const REDIRECT_REFUSED_BODY: &str =
    "Due to security reasons redirects are blocked on the IC until further notice!";

/// Body served when no certificate check succeeded.
pub const VERIFICATION_FAILED_BODY: &str = "Body does not pass verification";

/// Body served when a same-origin request names no canister.
pub const UNRESOLVED_IDENTITY_BODY: &str = "Could not find the canister ID.";

/// Errors raised by an RPC transport or its collaborators.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying agent failed (network, rejection, certificate).
    #[error("{0}")]
    Agent(String),

    /// Argument or result could not be (de)serialized.
    #[error("Failed to decode canister response: {0}")]
    Decode(String),

    /// Certificate material was rejected.
    #[error("Invalid certificate: {0}")]
    Certificate(String),

    /// Origin URL could not be used to build a transport.
    #[error("Invalid replica origin '{0}'")]
    InvalidOrigin(String),
}

/// Errors raised by the unverified passthrough fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unsupported method '{0}'")]
    Method(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Passthrough to '{0}' is not allowed")]
    HostNotAllowed(String),
}

/// Every way a single gateway request can fail.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No canister id could be resolved")]
    UnresolvedIdentity,

    #[error("Reserved path")]
    ReservedPath,

    #[error("Canister attempted a redirect")]
    RedirectRefused,

    #[error(transparent)]
    UnsupportedEncoding(#[from] CodecError),

    #[error("Body does not pass verification")]
    VerificationFailed,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Passthrough(#[from] FetchError),

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// HTTP status reported for this error.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::UnresolvedIdentity | GatewayError::ReservedPath => 404,
            GatewayError::Passthrough(FetchError::HostNotAllowed(_)) => 403,
            GatewayError::Passthrough(_) => 502,
            GatewayError::BodyTooLarge(_) => 413,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::RedirectRefused
            | GatewayError::UnsupportedEncoding(_)
            | GatewayError::VerificationFailed
            | GatewayError::Transport(_) => 500,
        }
    }

    /// Metric label for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnresolvedIdentity => "unresolved_identity",
            GatewayError::ReservedPath => "reserved_path",
            GatewayError::RedirectRefused => "redirect_refused",
            GatewayError::UnsupportedEncoding(_) => "unsupported_encoding",
            GatewayError::VerificationFailed => "verification_failed",
            GatewayError::Transport(_) => "transport",
            GatewayError::Passthrough(_) => "passthrough",
            GatewayError::BodyTooLarge(_) => "body_too_large",
            GatewayError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Convert into the response sent to the client.
    pub fn into_response(self) -> OutboundResponse {
        let status = self.status();
        match self {
            GatewayError::UnresolvedIdentity => {
                OutboundResponse::text(status, UNRESOLVED_IDENTITY_BODY)
            }
            GatewayError::ReservedPath => OutboundResponse::empty(status),
            GatewayError::RedirectRefused => OutboundResponse::text(status, REDIRECT_REFUSED_BODY),
            GatewayError::VerificationFailed => {
                OutboundResponse::text(status, VERIFICATION_FAILED_BODY)
            }
            GatewayError::UnsupportedEncoding(e) => {
                OutboundResponse::text(status, format!("Failed to fetch response: {}", e))
            }
            GatewayError::Transport(e) => {
                OutboundResponse::text(status, format!("Failed to fetch response: {}", e))
            }
            e @ (GatewayError::Passthrough(_)
            | GatewayError::BodyTooLarge(_)
            | GatewayError::InvalidRequest(_)) => {
                OutboundResponse::text(status, e.to_string())
            }
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
