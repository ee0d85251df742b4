//! The event dispatcher: one worker per event type, consuming its wildcard
//! subscription, decoding, routing, and settling messages.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Instant};

use futures::FutureExt;
use tracing::*;
use zkpay_bus::{BusClient, BusMessage, BusSubscription};
use zkpay_chain_events::{
    envelope::decode_envelope,
    events::*,
    EventKind, Subject,
};
use zkpay_primitives::slip44;
use zkpay_tasks::{ShutdownGuard, TaskExecutor};

use crate::{
    context::EventContext,
    errors::{Disposition, HandlerError, HandlerResult},
    handlers,
    metrics::DispatchMetrics,
    status::StatusChannel,
};

/// Subscribes and spawns one critical worker per event type.
pub async fn spawn_event_workers(
    executor: &TaskExecutor,
    bus: &dyn BusClient,
    ctx: Arc<EventContext>,
    metrics: Arc<DispatchMetrics>,
    status: StatusChannel,
) -> anyhow::Result<()> {
    for kind in EventKind::ALL {
        let sub = bus
            .subscribe(kind.subject_pattern())
            .await
            .map_err(|e| anyhow::anyhow!("subscribe {kind}: {e}"))?;
        let ctx = ctx.clone();
        let metrics = metrics.clone();
        let status = status.clone();
        executor.spawn_critical_async(&format!("event-worker-{kind}"), move |shutdown| {
            event_worker(shutdown, kind, sub, ctx, metrics, status)
        });
    }
    Ok(())
}

/// Consumes one subscription until shutdown.  Messages within it are
/// handled sequentially; parallelism comes from the per-event-type workers.
pub async fn event_worker(
    mut shutdown: ShutdownGuard,
    kind: EventKind,
    mut sub: Box<dyn BusSubscription>,
    ctx: Arc<EventContext>,
    metrics: Arc<DispatchMetrics>,
    status: StatusChannel,
) -> anyhow::Result<()> {
    info!(%kind, "event worker started");
    loop {
        tokio::select! {
            _ = shutdown.wait_for_shutdown() => break,
            maybe_msg = sub.next() => {
                let Some(msg) = maybe_msg else {
                    warn!(%kind, "subscription closed");
                    break;
                };
                process_message(kind, msg, &ctx, &metrics, &status).await;
            }
        }
    }
    info!(%kind, "event worker exiting");
    Ok(())
}

/// Handles one delivery end to end: metrics, decode, dispatch, panic
/// recovery, settlement.
async fn process_message(
    kind: EventKind,
    msg: BusMessage,
    ctx: &EventContext,
    metrics: &DispatchMetrics,
    status: &StatusChannel,
) {
    metrics.inc_received(kind);
    let started = Instant::now();
    let subject = msg.subject().clone();

    let outcome = AssertUnwindSafe(handle_message(kind, &subject, msg.payload(), ctx))
        .catch_unwind()
        .await;

    metrics.observe_duration(kind, started.elapsed());
    status.modify(|s| {
        s.events_received += 1;
        s.last_subject = Some(subject.to_string());
    });

    match outcome {
        Ok(Ok(())) => {
            metrics.inc_processed(kind);
            status.modify(|s| s.events_processed += 1);
            msg.ack();
        }
        Ok(Err(e)) => {
            metrics.inc_failed(kind);
            status.modify(|s| s.events_failed += 1);
            match e.disposition() {
                Disposition::Ack => {
                    error!(%kind, %subject, err = %e, class = e.kind(), "handler failed, consuming message");
                    msg.ack();
                }
                Disposition::Nack => {
                    warn!(%kind, %subject, err = %e, class = e.kind(), "handler failed, requesting redelivery");
                    msg.nack();
                }
            }
        }
        Err(_panic) => {
            metrics.inc_process_error(kind);
            status.modify(|s| s.events_failed += 1);
            error!(%kind, %subject, "handler panicked, requesting redelivery");
            msg.nack();
        }
    }
}

/// Decodes the envelope and routes to the typed handler.
async fn handle_message(
    kind: EventKind,
    subject: &Subject,
    payload: &[u8],
    ctx: &EventContext,
) -> HandlerResult<()> {
    let env = decode_envelope(payload).map_err(HandlerError::Decode)?;

    // Prefer the chain id carried in the subject; the envelope field is the
    // fallback for buses that flatten the hierarchy.
    match slip44::alias_to_slip44(&subject.chain_alias) {
        Some(subject_chain) if subject_chain == env.chain_id => {
            trace!(chain = env.chain_id, source = "subject", "resolved chain id");
        }
        Some(subject_chain) => {
            warn!(
                subject_chain,
                envelope_chain = env.chain_id,
                "subject and envelope disagree on chain, trusting envelope"
            );
        }
        None => {
            trace!(chain = env.chain_id, source = "envelope", "resolved chain id");
        }
    }

    match kind {
        EventKind::DepositReceived => {
            let ev = DepositReceived::decode(&env)?;
            handlers::deposit::handle_deposit_received(ctx, &env, &ev).await
        }
        EventKind::DepositRecorded => {
            let ev = DepositRecorded::decode(&env)?;
            handlers::deposit::handle_deposit_recorded(ctx, &env, &ev).await
        }
        EventKind::DepositUsed => {
            let ev = DepositUsed::decode(&env)?;
            handlers::commitment::handle_deposit_used(ctx, &env, &ev).await
        }
        EventKind::CommitmentRootUpdated => {
            let ev = CommitmentRootUpdated::decode(&env)?;
            handlers::commitment::handle_commitment_root_updated(ctx, &env, &ev).await
        }
        EventKind::WithdrawRequested => {
            let ev = WithdrawRequested::decode(&env)?;
            handlers::withdraw::handle_withdraw_requested(ctx, &env, &ev).await
        }
        EventKind::WithdrawExecuted => {
            let ev = WithdrawExecuted::decode(&env)?;
            handlers::withdraw::handle_withdraw_executed(ctx, &env, &ev).await
        }
        EventKind::IntentWithdrawExecuted => {
            let ev = IntentWithdrawExecuted::decode(&env)?;
            handlers::withdraw::handle_intent_withdraw_executed(ctx, &env, &ev).await
        }
        EventKind::PayoutExecuted => {
            let ev = PayoutExecuted::decode(&env)?;
            handlers::payout::handle_payout_executed(ctx, &env, &ev).await
        }
        EventKind::PayoutFailed => {
            let ev = PayoutFailed::decode(&env)?;
            handlers::payout::handle_payout_failed(ctx, &env, &ev).await
        }
        EventKind::HookExecuted => {
            let ev = HookExecuted::decode(&env)?;
            handlers::hook::handle_hook_executed(ctx, &env, &ev).await
        }
        EventKind::HookFailed => {
            let ev = HookFailed::decode(&env)?;
            handlers::hook::handle_hook_failed(ctx, &env, &ev).await
        }
        EventKind::FallbackTransferred => {
            let ev = FallbackTransferred::decode(&env)?;
            handlers::fallback::handle_fallback_transferred(ctx, &env, &ev).await
        }
        EventKind::FallbackFailed => {
            let ev = FallbackFailed::decode(&env)?;
            handlers::fallback::handle_fallback_failed(ctx, &env, &ev).await
        }
        EventKind::PayoutRetryRecordCreated => {
            let ev = PayoutRetryRecordCreated::decode(&env)?;
            handlers::payout::handle_payout_retry_record(ctx, &env, &ev).await
        }
        EventKind::FallbackRetryRecordCreated => {
            let ev = FallbackRetryRecordCreated::decode(&env)?;
            handlers::fallback::handle_fallback_retry_record(ctx, &env, &ev).await
        }
        EventKind::ManuallyResolved => {
            let ev = ManuallyResolved::decode(&env)?;
            handlers::resolve::handle_manually_resolved(ctx, &env, &ev).await
        }
    }
}
