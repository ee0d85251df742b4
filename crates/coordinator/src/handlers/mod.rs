//! Event handlers, one module per lifecycle concern.

pub mod commitment;
pub mod deposit;
pub mod fallback;
pub mod hook;
pub mod payout;
pub mod resolve;
pub mod withdraw;

use tracing::*;
use zkpay_chain_events::EventEnvelope;
use zkpay_db::types::{ArchiveKind, ArchivedEventEntry, EventKey, InsertOutcome};
use zkpay_primitives::buf::Buf32;
use zkpay_state::WithdrawRequestEntry;

use crate::{context::EventContext, errors::HandlerResult};

/// Persists the envelope into the event archive.  Returns `false` when the
/// `(chain_id, tx_hash, log_index)` key was already present, which callers
/// use purely for logging; handlers stay idempotent either way.
pub(crate) async fn archive_event(
    ctx: &EventContext,
    kind: ArchiveKind,
    env: &EventEnvelope,
) -> HandlerResult<bool> {
    let key = EventKey::new(env.chain_id, env.transaction_hash, env.log_index);
    let entry = ArchivedEventEntry {
        block_number: env.block_number,
        block_timestamp: env.block_timestamp,
        contract_address: env.contract_address.clone(),
        payload: env.event_data.to_string(),
        archived_at: 0,
    };
    let outcome = ctx.storage.archive().insert_event_async(kind, key, entry).await?;
    if outcome == InsertOutcome::AlreadyExists {
        info!(
            chain = env.chain_id,
            tx = %env.transaction_hash,
            log_index = env.log_index,
            "event already archived, replay"
        );
        return Ok(false);
    }
    Ok(true)
}

/// Finds a withdraw request by its nullifier, falling back to the
/// deprecated request-id index for pre-nullifier rows.
pub(crate) async fn find_request_by_key(
    ctx: &EventContext,
    key: &Buf32,
) -> HandlerResult<Option<WithdrawRequestEntry>> {
    if let Some(req) = ctx
        .storage
        .withdraw()
        .get_request_by_nullifier_async(*key)
        .await?
    {
        return Ok(Some(req));
    }
    Ok(ctx
        .storage
        .withdraw()
        .get_request_by_legacy_id_async(*key)
        .await?)
}
