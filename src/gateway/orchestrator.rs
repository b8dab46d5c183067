//! Query call with a single, conditional upgrade to an update call.

use candid::Principal;

use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::transport::Transport;
use crate::gateway::types::{RpcRequest, RpcResponse};
use crate::observability::metrics;

/// Result of forwarding one request to a canister.
#[derive(Debug)]
pub struct Forwarded {
    pub response: RpcResponse,
    /// The response came from `http_request_update`.
    pub upgraded: bool,
}

/// Send `request` as a query and, if the canister asks for it, once more as
/// an update call.
///
/// Redirects are refused outright: a `Location` cannot be certified.
pub async fn forward(
    transport: &dyn Transport,
    canister_id: Principal,
    request: &RpcRequest,
) -> GatewayResult<Forwarded> {
    let response = transport.http_request(canister_id, request).await?;
    refuse_redirect(canister_id, &response)?;

    if !response.upgrade {
        return Ok(Forwarded {
            response,
            upgraded: false,
        });
    }

    tracing::debug!(canister_id = %canister_id, url = %request.url, "Upgrading to update call");
    metrics::record_upgrade();

    let response = transport.http_request_update(canister_id, request).await?;
    refuse_redirect(canister_id, &response)?;

    Ok(Forwarded {
        response,
        upgraded: true,
    })
}

fn refuse_redirect(canister_id: Principal, response: &RpcResponse) -> GatewayResult<()> {
    if response.is_redirect() {
        tracing::error!(
            canister_id = %canister_id,
            status = response.status_code,
            "Due to security reasons redirects are blocked on the IC until further notice!"
        );
        metrics::record_redirect_refused();
        return Err(GatewayError::RedirectRefused);
    }
    Ok(())
}
