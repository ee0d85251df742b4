//! DepositReceived / DepositRecorded handling: checkbook creation and the
//! promotion out of `pending`.

use tracing::*;
use zkpay_chain_events::{
    events::{DepositReceived, DepositRecorded},
    EventEnvelope,
};
use zkpay_db::{
    types::{ArchiveKind, DepositRecordUpdate},
    DbError,
};
use zkpay_primitives::{address::UniversalAddress, slip44, token::DEFAULT_TOKEN_KEY};
use zkpay_state::{CheckbookEntry, CheckbookStatus};

use super::archive_event;
use crate::{
    context::EventContext,
    errors::{HandlerError, HandlerResult},
};

/// First sight of a deposit.  Creates the checkbook in `pending` with
/// defaults; a later DepositRecorded fills in the real fields.  Replays and
/// already-tracked deposits are informational only.
pub async fn handle_deposit_received(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &DepositReceived,
) -> HandlerResult<()> {
    archive_event(ctx, ArchiveKind::DepositReceived, env).await?;

    if let Some(existing) = ctx
        .storage
        .checkbook()
        .get_checkbook_by_deposit_async(env.chain_id, ev.local_deposit_id)
        .await?
    {
        debug!(
            checkbook = %existing.id,
            local_deposit_id = ev.local_deposit_id,
            "deposit already tracked"
        );
        return Ok(());
    }

    let entry = CheckbookEntry::new_pending(
        uuid::Uuid::new_v4().to_string(),
        UniversalAddress::new(env.chain_id, ev.depositor),
        env.chain_id,
        ev.local_deposit_id,
        ev.amount,
        DEFAULT_TOKEN_KEY.to_owned(),
        env.transaction_hash,
        ev.promote_code.clone(),
    );

    let created = match ctx.storage.checkbook().create_checkbook_async(entry).await {
        Ok(created) => created,
        // Lost a race against a concurrent delivery of the same deposit;
        // the row exists, which is all we wanted.
        Err(e @ DbError::DuplicateDepositKey(..)) => {
            info!(err = %e, "checkbook created concurrently, treating as replay");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        checkbook = %created.id,
        chain = env.chain_id,
        local_deposit_id = ev.local_deposit_id,
        amount = %created.amount,
        "created checkbook"
    );
    ctx.notifier.push_checkbook_direct(&created, "DepositReceived");
    Ok(())
}

/// The proxy's authoritative record of the deposit: resolves the hashed
/// token key, applies amounts and ownership, and promotes the status in the
/// same transaction.
pub async fn handle_deposit_recorded(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &DepositRecorded,
) -> HandlerResult<()> {
    archive_event(ctx, ArchiveKind::DepositRecorded, env).await?;

    let Some(symbol) = ctx.tokens.resolve(&ev.token_key_hash) else {
        // Unresolvable symbol means our registry is behind the contracts;
        // abort so the bus redelivers once the registry is fixed.
        error!(hash = %ev.token_key_hash, "token key hash not in registry, aborting message");
        return Err(HandlerError::UnknownTokenKey(ev.token_key_hash.to_hex()));
    };

    let checkbook = ctx
        .storage
        .checkbook()
        .get_checkbook_by_deposit_async(env.chain_id, ev.local_deposit_id)
        .await?
        .ok_or_else(|| {
            warn!(
                chain = env.chain_id,
                local_deposit_id = ev.local_deposit_id,
                "deposit recorded before received, will retry"
            );
            HandlerError::lookup_miss(
                "checkbook",
                format!("({}, {})", env.chain_id, ev.local_deposit_id),
            )
        })?;

    // BSC deposits skip the client-signing step entirely.
    let target = if env.chain_id == slip44::BSC {
        CheckbookStatus::ReadyForCommitment
    } else {
        CheckbookStatus::Unsigned
    };

    let update = DepositRecordUpdate {
        token_key: symbol.to_owned(),
        amount: ev.gross_amount,
        allocatable_amount: ev.allocatable_amount,
        fee_total_locked: ev.fee_total_locked,
        owner: ev.owner,
        promote_code: ev.promote_code.clone(),
    };

    let updated = ctx
        .storage
        .checkbook()
        .record_deposit_async(checkbook.id.clone(), update, target)
        .await?;

    info!(
        checkbook = %updated.id,
        token_key = %updated.token_key,
        status = updated.status.as_str(),
        "recorded deposit"
    );
    ctx.notifier.push_checkbook_direct(&updated, "DepositRecorded");
    Ok(())
}
