//! Fallback-transfer handling, orthogonal to the payout/hook stages.

use tracing::*;
use zkpay_chain_events::{
    events::{FallbackFailed, FallbackRetryRecordCreated, FallbackTransferred},
    EventEnvelope,
};
use zkpay_db::types::FallbackUpdate;

use super::find_request_by_key;
use crate::{context::EventContext, errors::HandlerResult};

pub async fn handle_fallback_transferred(
    ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &FallbackTransferred,
) -> HandlerResult<()> {
    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        warn!(request_id = %ev.request_id, "fallback transfer for untracked request");
        return Ok(());
    };

    ctx.storage
        .withdraw()
        .update_fallback_async(request.id.clone(), FallbackUpdate::Transferred)
        .await?;

    info!(request = %request.id, amount = %ev.amount, "fallback transferred");

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier
            .push_withdraw_update(&updated, "FallbackTransferred");
    }
    Ok(())
}

pub async fn handle_fallback_failed(
    ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &FallbackFailed,
) -> HandlerResult<()> {
    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        warn!(request_id = %ev.request_id, "fallback failure for untracked request");
        return Ok(());
    };

    let error = ev
        .error_reason
        .clone()
        .unwrap_or_else(|| "fallback transfer failed".to_owned());
    ctx.storage
        .withdraw()
        .update_fallback_async(request.id.clone(), FallbackUpdate::Failed { error })
        .await?;

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "FallbackFailed");
    }
    Ok(())
}

pub async fn handle_fallback_retry_record(
    _ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &FallbackRetryRecordCreated,
) -> HandlerResult<()> {
    info!(
        record_id = ev.record_id,
        request_id = %ev.request_id,
        reason = ev.error_reason.as_deref().unwrap_or(""),
        "fallback retry record created"
    );
    Ok(())
}
