//! Manual resolution: an operator closes out a request regardless of where
//! its stages are stuck.

use tracing::*;
use zkpay_chain_events::{events::ManuallyResolved, EventEnvelope};

use super::find_request_by_key;
use crate::{
    context::EventContext,
    errors::{HandlerError, HandlerResult},
};

pub async fn handle_manually_resolved(
    ctx: &EventContext,
    _env: &EventEnvelope,
    ev: &ManuallyResolved,
) -> HandlerResult<()> {
    let request = find_request_by_key(ctx, &ev.request_id)
        .await?
        .ok_or_else(|| HandlerError::lookup_miss("withdraw_request", ev.request_id.to_hex()))?;

    ctx.storage
        .withdraw()
        .mark_resolved_async(request.id.clone(), ev.resolver.clone(), ev.note.clone())
        .await?;

    info!(
        request = %request.id,
        resolver = %ev.resolver,
        "request manually resolved"
    );

    if let Some(updated) = ctx.storage.withdraw().get_request_async(request.id).await? {
        ctx.notifier.push_withdraw_update(&updated, "ManuallyResolved");
    }
    Ok(())
}
