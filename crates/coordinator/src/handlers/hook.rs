//! Post-payout hook stage handling; structurally the payout stage again,
//! driven by the intent manager.

use tracing::*;
use zkpay_chain_events::{
    events::{HookExecuted, HookFailed},
    EventEnvelope,
};
use zkpay_db::types::HookStatusUpdate;

use super::find_request_by_key;
use crate::{context::EventContext, errors::HandlerResult};

pub async fn handle_hook_executed(
    ctx: &EventContext,
    env: &EventEnvelope,
    ev: &HookExecuted,
) -> HandlerResult<()> {
    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        warn!(request_id = %ev.request_id, "hook executed for untracked request");
        return Ok(());
    };

    ctx.storage
        .withdraw()
        .update_hook_status_async(
            request.id.clone(),
            HookStatusUpdate::Completed {
                tx_hash: env.transaction_hash,
            },
        )
        .await?;

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "HookExecuted");
    }
    Ok(())
}

pub async fn handle_hook_failed(
    ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &HookFailed,
) -> HandlerResult<()> {
    let Some(request) = find_request_by_key(ctx, &ev.request_id).await? else {
        warn!(request_id = %ev.request_id, "hook failure for untracked request");
        return Ok(());
    };

    let error = ev
        .error_data
        .clone()
        .unwrap_or_else(|| "hook execution failed".to_owned());
    ctx.storage
        .withdraw()
        .update_hook_status_async(request.id.clone(), HookStatusUpdate::Failed { error })
        .await?;

    warn!(request = %request.id, "hook failed, awaiting exogenous retry");

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "HookFailed");
    }
    Ok(())
}
