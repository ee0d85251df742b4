//! Payout-stage event handling.  Retries are exogenous: the coordinator
//! only records outcomes reported from the chain.

use tracing::*;
use zkpay_chain_events::{
    events::{PayoutExecuted, PayoutFailed, PayoutRetryRecordCreated},
    EventEnvelope,
};
use zkpay_db::types::PayoutStatusUpdate;

use super::find_request_by_key;
use crate::{context::EventContext, errors::HandlerResult};

pub async fn handle_payout_executed(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &PayoutExecuted,
) -> HandlerResult<()> {
    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        warn!(request_id = %ev.request_id, "payout executed for untracked request");
        return Ok(());
    };

    ctx.storage
        .withdraw()
        .update_payout_status_async(
            request.id.clone(),
            PayoutStatusUpdate::Completed {
                tx_hash: env.transaction_hash,
                block_number: env.block_number,
            },
        )
        .await?;

    info!(
        request = %request.id,
        amount = %ev.amount,
        actual_output = %ev.actual_output.unwrap_or(ev.amount),
        "payout completed"
    );

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "PayoutExecuted");
    }
    Ok(())
}

pub async fn handle_payout_failed(
    ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &PayoutFailed,
) -> HandlerResult<()> {
    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        warn!(request_id = %ev.request_id, "payout failure for untracked request");
        return Ok(());
    };

    ctx.storage
        .withdraw()
        .update_payout_status_async(
            request.id.clone(),
            PayoutStatusUpdate::Failed {
                error: ev.error_reason.clone(),
            },
        )
        .await?;

    warn!(
        request = %request.id,
        reason = %ev.error_reason,
        "payout failed, awaiting exogenous retry"
    );

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "PayoutFailed");
    }
    Ok(())
}

/// The retry worker opened a record on-chain; informational only, the
/// eventual PayoutExecuted/PayoutFailed will carry the outcome.
pub async fn handle_payout_retry_record(
    _ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &PayoutRetryRecordCreated,
) -> HandlerResult<()> {
    info!(
        record_id = ev.record_id,
        request_id = %ev.request_id,
        reason = ev.error_reason.as_deref().unwrap_or(""),
        "payout retry record created"
    );
    Ok(())
}
