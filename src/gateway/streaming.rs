//! Reassembly of bodies delivered over several calls.

use candid::Principal;

use crate::gateway::error::TransportError;
use crate::gateway::transport::Transport;
use crate::gateway::types::StreamingDescriptor;
use crate::observability::metrics;

/// Append every continuation chunk to `first_chunk`.
///
/// Chunks are fetched one at a time, in the order the descriptor chain hands
/// them out. Each descriptor is moved into the transport, so none is used
/// twice.
pub async fn reassemble(
    transport: &dyn Transport,
    canister_id: Principal,
    first_chunk: Vec<u8>,
    descriptor: Option<StreamingDescriptor>,
) -> Result<Vec<u8>, TransportError> {
    let mut body = first_chunk;
    let mut next = descriptor;
    let mut chunks = 0u64;

    while let Some(descriptor) = next.take() {
        let chunk = transport.stream_next(canister_id, descriptor).await?;
        body.extend_from_slice(&chunk.body);
        next = chunk.next;
        chunks += 1;
    }

    if chunks > 0 {
        tracing::debug!(
            canister_id = %canister_id,
            chunks,
            bytes = body.len(),
            "Reassembled streamed body"
        );
        metrics::record_stream_chunks(chunks);
    }

    Ok(body)
}
