//! Asset certification: a body is accepted when its SHA-256 sits under
//! `http_assets/<path>` in a tree whose root hash the canister certified.

use async_trait::async_trait;
use candid::Principal;
use ic_agent::hash_tree::{HashTree, LookupResult};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::gateway::error::TransportError;
use crate::gateway::transport::{BodyVerifier, Transport};

const ASSETS_LABEL: &[u8] = b"http_assets";
const FALLBACK_PATH: &str = "/index.html";

#[derive(Debug, Error)]
enum VerifyError {
    #[error(transparent)]
    Certificate(#[from] TransportError),

    #[error("Malformed tree: {0}")]
    Tree(#[from] serde_cbor::Error),

    #[error("Tree root hash does not match certified data")]
    RootMismatch,

    #[error("No asset hash for '{0}'")]
    MissingAsset(String),

    #[error("Body hash does not match the certified hash")]
    HashMismatch,
}

/// [`BodyVerifier`] for the asset certification scheme.
#[derive(Debug, Clone, Default)]
pub struct CertificateVerifier;

impl CertificateVerifier {
    pub fn new() -> Self {
        Self
    }

    async fn check(
        &self,
        transport: &dyn Transport,
        canister_id: Principal,
        path: &str,
        body: &[u8],
        certificate: &[u8],
        tree: &[u8],
    ) -> Result<(), VerifyError> {
        let certified_data = transport.certified_data(canister_id, certificate).await?;

        let tree: HashTree<Vec<u8>> = serde_cbor::from_slice(tree)?;
        if tree.digest().as_slice() != certified_data.as_slice() {
            return Err(VerifyError::RootMismatch);
        }

        let expected = asset_hash(&tree, path)
            .or_else(|| asset_hash(&tree, FALLBACK_PATH))
            .ok_or_else(|| VerifyError::MissingAsset(path.to_string()))?;

        if Sha256::digest(body).as_slice() != expected.as_slice() {
            return Err(VerifyError::HashMismatch);
        }
        Ok(())
    }
}

fn asset_hash(tree: &HashTree<Vec<u8>>, path: &str) -> Option<Vec<u8>> {
    match tree.lookup_path([ASSETS_LABEL, path.as_bytes()]) {
        LookupResult::Found(hash) => Some(hash.to_vec()),
        _ => None,
    }
}

#[async_trait]
impl BodyVerifier for CertificateVerifier {
    async fn verify(
        &self,
        transport: &dyn Transport,
        canister_id: Principal,
        path: &str,
        body: &[u8],
        certificate: &[u8],
        tree: &[u8],
    ) -> bool {
        match self
            .check(transport, canister_id, path, body, certificate, tree)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(canister_id = %canister_id, path, error = %err, "Body rejected");
                false
            }
        }
    }
}
