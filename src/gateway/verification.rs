//! Release gate for canister responses.
//!
//! A response leaves the gateway only if it came from an update call, or its
//! certificate and tree verify against the raw body or, failing that, the
//! decoded body. The raw body is always tried first: some canisters certify
//! the encoded bytes, older ones the decoded content.

use std::sync::Arc;

use candid::Principal;

use crate::gateway::certificate::CertificateMaterial;
use crate::gateway::transport::{BodyVerifier, Transport};
use crate::observability::metrics;

/// Everything the gate looks at for one response.
#[derive(Debug)]
pub struct VerificationInput<'a> {
    pub canister_id: Principal,
    pub path: &'a str,
    pub raw_body: &'a [u8],
    pub decoded_body: &'a [u8],
    pub material: &'a CertificateMaterial,
    pub upgraded: bool,
}

/// Why a response was released or held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Served from the update call; the agent already checked it.
    Upgraded,
    /// The body as received verified.
    RawBody,
    /// Only the decoded body verified.
    DecodedBody,
    /// Certificate or tree header absent.
    MissingCertificate,
    /// Neither body verified.
    Rejected,
}

impl VerificationOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            VerificationOutcome::Upgraded
                | VerificationOutcome::RawBody
                | VerificationOutcome::DecodedBody
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerificationOutcome::Upgraded => "upgraded",
            VerificationOutcome::RawBody => "raw_body",
            VerificationOutcome::DecodedBody => "decoded_body",
            VerificationOutcome::MissingCertificate => "missing_certificate",
            VerificationOutcome::Rejected => "rejected",
        }
    }
}

/// Applies a [`BodyVerifier`] with the release rules above.
#[derive(Clone)]
pub struct VerificationGate {
    verifier: Arc<dyn BodyVerifier>,
}

impl VerificationGate {
    pub fn new(verifier: Arc<dyn BodyVerifier>) -> Self {
        Self { verifier }
    }

    pub async fn accept(
        &self,
        transport: &dyn Transport,
        input: VerificationInput<'_>,
    ) -> VerificationOutcome {
        let outcome = self.evaluate(transport, &input).await;
        metrics::record_verification(outcome.as_str());
        outcome
    }

    async fn evaluate(
        &self,
        transport: &dyn Transport,
        input: &VerificationInput<'_>,
    ) -> VerificationOutcome {
        if input.upgraded {
            return VerificationOutcome::Upgraded;
        }

        let Some((certificate, tree)) = input.material.parts() else {
            return VerificationOutcome::MissingCertificate;
        };

        let (canister_id, path) = (input.canister_id, input.path);

        if self
            .verifier
            .verify(transport, canister_id, path, input.raw_body, certificate, tree)
            .await
        {
            return VerificationOutcome::RawBody;
        }
        if self
            .verifier
            .verify(transport, canister_id, path, input.decoded_body, certificate, tree)
            .await
        {
            return VerificationOutcome::DecodedBody;
        }

        VerificationOutcome::Rejected
    }
}
