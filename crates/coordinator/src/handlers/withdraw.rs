//! WithdrawRequested / WithdrawExecuted handling: the execute stage of the
//! pipeline and the allocation commit.

use std::collections::BTreeSet;

use tracing::*;
use zkpay_chain_events::{
    events::{IntentWithdrawExecuted, WithdrawExecuted, WithdrawRequested, WorkerType},
    EventEnvelope,
};
use zkpay_db::types::{ArchiveKind, ExecuteStatusUpdate, UpdateOutcome};
use zkpay_state::{AllocationEntry, ExecuteStatus, WithdrawRequestEntry};

use super::{archive_event, find_request_by_key};
use crate::{
    context::EventContext,
    errors::{HandlerError, HandlerResult},
};

fn success_update(env: &EventEnvelope) -> ExecuteStatusUpdate {
    ExecuteStatusUpdate {
        status: ExecuteStatus::Success,
        tx_hash: Some(env.transaction_hash),
        block_number: Some(env.block_number),
        error: None,
    }
}

/// The proxy accepted the withdrawal on-chain.
pub async fn handle_withdraw_requested(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &WithdrawRequested,
) -> HandlerResult<()> {
    archive_event(ctx, ArchiveKind::WithdrawRequested, env).await?;

    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        // Withdrawals initiated outside this backend have no tracked
        // request; that is fine, the chain is the source of truth.
        warn!(request_id = %ev.request_id, "withdraw requested for untracked request");
        return Ok(());
    };

    // Legacy rows reference allocations by the raw request key; surface the
    // linkage for operators but drive state only through the request.
    let legacy_allocs = ctx
        .storage
        .allocation()
        .get_allocations_by_legacy_request_async(ev.request_id)
        .await?;
    if !legacy_allocs.is_empty() {
        debug!(
            request = %request.id,
            count = legacy_allocs.len(),
            "matched legacy allocations by request key"
        );
    }

    let outcome = ctx
        .storage
        .withdraw()
        .update_execute_status_async(request.id.clone(), success_update(env))
        .await?;
    if outcome == UpdateOutcome::PredicateMiss {
        info!(request = %request.id, "execute status already terminal");
    }

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "WithdrawRequested");
    }
    Ok(())
}

/// The treasury executed the withdrawal: consume the allocations and
/// confirm the execute stage.
pub async fn handle_withdraw_executed(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &WithdrawExecuted,
) -> HandlerResult<()> {
    archive_event(ctx, ArchiveKind::WithdrawExecuted, env).await?;

    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        return handle_untracked_execution(ctx, ev).await;
    };

    // The executed amount must match what we reserved; disagreement means a
    // logic fault somewhere and no state may change.
    if ev.amount != request.amount {
        error!(
            request = %request.id,
            event_amount = %ev.amount,
            tracked_amount = %request.amount,
            "executed amount disagrees with tracked request"
        );
        return Err(HandlerError::VerifyMismatch {
            event: ev.amount.to_string(),
            tracked: request.amount.to_string(),
        });
    }

    let allocations = find_request_allocations(ctx, &request, ev).await?;
    if allocations.is_empty() {
        warn!(request = %request.id, "no allocations linked to executed request");
    } else {
        let ids: Vec<String> = allocations.iter().map(|a| a.id.clone()).collect();
        let used = ctx.storage.allocation().mark_used_async(ids.clone()).await?;
        if used < ids.len() {
            info!(
                request = %request.id,
                used,
                total = ids.len(),
                "some allocations already consumed"
            );
        }
    }

    // Confirm the execute stage if the requested event never landed.
    let outcome = ctx
        .storage
        .withdraw()
        .update_execute_status_async(request.id.clone(), success_update(env))
        .await?;
    if outcome == UpdateOutcome::PredicateMiss {
        debug!(request = %request.id, "execute already confirmed");
    }

    push_parent_checkbooks(ctx, &allocations, "WithdrawExecuted").await?;
    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "WithdrawExecuted");
    }
    Ok(())
}

/// The intent manager's worker report; informational only.
pub async fn handle_intent_withdraw_executed(
    _ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &IntentWithdrawExecuted,
) -> HandlerResult<()> {
    info!(
        worker = ?WorkerType::from_u8(ev.worker_type),
        success = ev.success,
        message = ev.message.as_deref().unwrap_or(""),
        "intent worker execution report"
    );
    Ok(())
}

/// Allocations for an executed request, by back-pointer first, then the
/// legacy indexes.
async fn find_request_allocations(
    ctx: &EventContext,
    request: &WithdrawRequestEntry,
    ev: &WithdrawExecuted,
) -> HandlerResult<Vec<AllocationEntry>> {
    let held = ctx
        .storage
        .allocation()
        .get_allocations_by_withdraw_request_async(request.id.clone())
        .await?;
    if !held.is_empty() {
        return Ok(held);
    }

    if let Some(legacy) = &request.legacy_request_id {
        let by_legacy = ctx
            .storage
            .allocation()
            .get_allocations_by_legacy_request_async(*legacy)
            .await?;
        if !by_legacy.is_empty() {
            return Ok(by_legacy);
        }
    }

    Ok(ctx
        .storage
        .allocation()
        .get_allocation_by_nullifier_async(ev.request_id)
        .await?
        .into_iter()
        .collect())
}

/// Execution for a request we never tracked: consume any allocation the
/// nullifier points at directly (legacy client flow).
async fn handle_untracked_execution(
    ctx: &EventContext,
    ev: &WithdrawExecuted,
) -> HandlerResult<()> {
    let mut allocations = ctx
        .storage
        .allocation()
        .get_allocations_by_legacy_request_async(ev.request_id)
        .await?;
    if allocations.is_empty() {
        if let Some(a) = ctx
            .storage
            .allocation()
            .get_allocation_by_nullifier_async(ev.request_id)
            .await?
        {
            allocations.push(a);
        }
    }

    if allocations.is_empty() {
        warn!(request_id = %ev.request_id, "withdraw executed for unknown request, ignoring");
        return Ok(());
    }

    let ids: Vec<String> = allocations.iter().map(|a| a.id.clone()).collect();
    ctx.storage.allocation().mark_used_async(ids).await?;
    push_parent_checkbooks(ctx, &allocations, "WithdrawExecuted").await?;
    Ok(())
}

/// One checkbook push per unique parent, so the UI refreshes the allocation
/// set even though the checkbook's own status did not change.
async fn push_parent_checkbooks(
    ctx: &EventContext,
    allocations: &[AllocationEntry],
    context: &str,
) -> HandlerResult<()> {
    let parents: BTreeSet<String> = allocations
        .iter()
        .map(|a| a.checkbook_id.clone())
        .collect();
    for checkbook_id in parents {
        match ctx
            .storage
            .checkbook()
            .get_checkbook_async(checkbook_id.clone())
            .await?
        {
            Some(checkbook) => ctx.notifier.push_checkbook_direct(&checkbook, context),
            None => warn!(%checkbook_id, "allocation points at missing checkbook"),
        }
    }
    Ok(())
}
