//! Intake for the external prover's result stream.
//!
//! Proof generation itself is an external async job; the coordinator only
//! consumes outcomes and advances the affected aggregates.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::*;
use zkpay_db::types::{ProofStatusUpdate, UpdateOutcome};
use zkpay_primitives::buf::Buf32;
use zkpay_state::CheckbookStatus;
use zkpay_tasks::ShutdownGuard;

use crate::context::EventContext;

/// One result from the prover.
#[derive(Clone, Debug)]
pub enum ProverOutcome {
    CommitmentProofCompleted {
        checkbook_id: String,
        proof: Vec<u8>,
        public_values: Vec<u8>,
    },
    CommitmentProofFailed {
        checkbook_id: String,
        error: String,
    },
    WithdrawProofCompleted {
        request_id: String,
        proof: Vec<u8>,
        public_values: Vec<u8>,
    },
    WithdrawProofFailed {
        request_id: String,
        error: String,
    },
}

/// Consumes prover outcomes until shutdown.
pub async fn prover_intake_task(
    mut shutdown: ShutdownGuard,
    mut rx: mpsc::Receiver<ProverOutcome>,
    ctx: Arc<EventContext>,
) -> anyhow::Result<()> {
    info!("prover intake started");
    loop {
        tokio::select! {
            _ = shutdown.wait_for_shutdown() => break,
            maybe = rx.recv() => {
                let Some(outcome) = maybe else {
                    warn!("prover outcome channel closed");
                    break;
                };
                handle_outcome(&ctx, outcome).await?;
            }
        }
    }
    info!("prover intake exiting");
    Ok(())
}

async fn handle_outcome(ctx: &EventContext, outcome: ProverOutcome) -> anyhow::Result<()> {
    match outcome {
        ProverOutcome::CommitmentProofCompleted {
            checkbook_id,
            proof,
            public_values,
        } => {
            let res = ctx
                .storage
                .checkbook()
                .set_proof_artifacts_async(
                    checkbook_id.clone(),
                    proof,
                    public_values,
                    CheckbookStatus::SubmittingCommitment,
                )
                .await?;
            if res == UpdateOutcome::PredicateMiss {
                info!(checkbook = %checkbook_id, "proof landed on already-advanced checkbook");
            } else {
                info!(checkbook = %checkbook_id, "proof ready, handing commitment to submitter");
            }
            if let Some(updated) = ctx
                .storage
                .checkbook()
                .get_checkbook_async(checkbook_id)
                .await?
            {
                ctx.notifier.push_checkbook_direct(&updated, "CommitmentProofCompleted");
            }
        }

        ProverOutcome::CommitmentProofFailed {
            checkbook_id,
            error,
        } => {
            // The checkbook stays in generating_proof; the prover retries
            // on its own schedule.
            error!(checkbook = %checkbook_id, %error, "commitment proof generation failed");
        }

        ProverOutcome::WithdrawProofCompleted {
            request_id,
            proof,
            public_values,
        } => {
            let real_nullifier = leading_nullifier(&public_values);

            ctx.storage
                .withdraw()
                .update_proof_status_async(
                    request_id.clone(),
                    ProofStatusUpdate::Completed {
                        proof,
                        public_values,
                    },
                )
                .await?;

            // The prover's first public value is the authoritative
            // nullifier; swap the provisional one if they differ.  A unique
            // violation here is unrecoverable and takes the intake down.
            if let Some(nullifier) = real_nullifier {
                let current = ctx
                    .storage
                    .withdraw()
                    .get_request_async(request_id.clone())
                    .await?;
                if let Some(current) = current {
                    if current.withdraw_nullifier != nullifier {
                        info!(
                            request = %request_id,
                            %nullifier,
                            "updating withdraw nullifier from proof public values"
                        );
                        ctx.storage
                            .withdraw()
                            .update_withdraw_nullifier_async(request_id.clone(), nullifier)
                            .await?;
                    }
                }
            }

            if let Some(updated) = ctx
                .storage
                .withdraw()
                .get_request_async(request_id)
                .await?
            {
                ctx.notifier
                    .push_withdraw_update(&updated, "WithdrawProofCompleted");
            }
        }

        ProverOutcome::WithdrawProofFailed { request_id, error } => {
            ctx.storage
                .withdraw()
                .update_proof_status_async(
                    request_id.clone(),
                    ProofStatusUpdate::Failed {
                        error: error.clone(),
                    },
                )
                .await?;
            warn!(request = %request_id, %error, "withdraw proof generation failed");
            if let Some(updated) = ctx
                .storage
                .withdraw()
                .get_request_async(request_id)
                .await?
            {
                ctx.notifier
                    .push_withdraw_update(&updated, "WithdrawProofFailed");
            }
        }
    }
    Ok(())
}

/// First 32 bytes of the public values, which the circuits lay out as the
/// spent nullifier.
fn leading_nullifier(public_values: &[u8]) -> Option<Buf32> {
    let head: [u8; 32] = public_values.get(..32)?.try_into().ok()?;
    Some(Buf32::from(head))
}
