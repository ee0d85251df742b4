//! DepositUsed / CommitmentRootUpdated handling: the tail of the checkbook
//! lifecycle and the queue-root chain.

use tracing::*;
use zkpay_chain_events::{
    events::{CommitmentRootUpdated, DepositUsed},
    EventEnvelope,
};
use zkpay_db::types::{ArchiveKind, InsertOutcome, UpdateOutcome};
use zkpay_state::{CheckbookStatus, QueueRootEntry};

use super::archive_event;
use crate::{
    context::EventContext,
    errors::{HandlerError, HandlerResult},
};

/// The chain accepted a submitted commitment: record the commitment hash on
/// the checkbook and move it to `commitment_pending` to await the matching
/// root update.
pub async fn handle_deposit_used(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &DepositUsed,
) -> HandlerResult<()> {
    archive_event(ctx, ArchiveKind::DepositUsed, env).await?;

    let checkbook = ctx
        .storage
        .checkbook()
        .get_checkbook_by_deposit_async(env.chain_id, ev.local_deposit_id)
        .await?
        .ok_or_else(|| {
            HandlerError::lookup_miss(
                "checkbook",
                format!("({}, {})", env.chain_id, ev.local_deposit_id),
            )
        })?;

    let outcome = ctx
        .storage
        .checkbook()
        .set_commitment_async(
            checkbook.id.clone(),
            ev.commitment,
            CheckbookStatus::CommitmentPending,
        )
        .await?;
    if outcome == UpdateOutcome::PredicateMiss {
        info!(checkbook = %checkbook.id, "already at or past commitment_pending");
    }

    // The matching root update may have raced ahead of this event; it could
    // not join against the commitment then, so finish the promotion now.
    if ctx
        .storage
        .queue_root()
        .get_root_by_commitment_async(ev.commitment)
        .await?
        .is_some()
    {
        debug!(checkbook = %checkbook.id, "commitment root already landed");
        ctx.storage
            .checkbook()
            .promote_checkbook_async(checkbook.id.clone(), CheckbookStatus::WithCheckbook)
            .await?;
    }

    if let Some(updated) = ctx
        .storage
        .checkbook()
        .get_checkbook_async(checkbook.id.clone())
        .await?
    {
        ctx.notifier.push_checkbook_direct(&updated, "DepositUsed");
    }
    Ok(())
}

/// A new commitment root landed: extend the root chain and finish any
/// checkbook whose commitment produced it.
pub async fn handle_commitment_root_updated(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &CommitmentRootUpdated,
) -> HandlerResult<()> {
    archive_event(ctx, ArchiveKind::CommitmentRootUpdated, env).await?;

    let entry = QueueRootEntry {
        chain_id: env.chain_id,
        root: ev.new_root,
        // A zero old root marks the start of the chain.
        previous_root: (!ev.old_root.is_zero()).then_some(ev.old_root),
        created_by_commitment: ev.commitment,
        block_number: env.block_number,
        tx_hash: env.transaction_hash,
        created_at: 0,
    };

    match ctx.storage.queue_root().create_root_async(entry).await? {
        InsertOutcome::Inserted => {
            debug!(chain = env.chain_id, root = %ev.new_root, "stored queue root");
        }
        // Unique conflict on the root key is a replayed update; nothing
        // else to do for the chain.
        InsertOutcome::AlreadyExists => {
            info!(chain = env.chain_id, root = %ev.new_root, "queue root replayed");
        }
    }

    // Promote the checkbook whose commitment this root confirms, if we
    // track one.  Back-filled roots for foreign commitments are expected.
    let Some(checkbook) = ctx
        .storage
        .checkbook()
        .get_checkbook_by_commitment_async(ev.commitment)
        .await?
    else {
        warn!(commitment = %ev.commitment, "no checkbook for confirmed commitment");
        return Ok(());
    };

    let outcome = ctx
        .storage
        .checkbook()
        .promote_checkbook_async(checkbook.id.clone(), CheckbookStatus::WithCheckbook)
        .await?;
    if outcome == UpdateOutcome::PredicateMiss {
        info!(checkbook = %checkbook.id, "already with_checkbook");
    }

    if let Some(updated) = ctx
        .storage
        .checkbook()
        .get_checkbook_async(checkbook.id.clone())
        .await?
    {
        ctx.notifier
            .push_checkbook_direct(&updated, "CommitmentRootUpdated");
    }
    Ok(())
}
