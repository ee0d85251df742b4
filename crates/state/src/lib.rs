//! Domain entities tracked by the coordinator and their status machines.
//!
//! These types are what the repositories persist; the transition rules that
//! drive them live in the coordinator crate, while the hard invariants
//! (ordinal promotion, terminal execute statuses) are encoded here so no
//! caller can express an illegal transition.

pub mod allocation;
pub mod checkbook;
pub mod queue_root;
pub mod withdraw;

pub use allocation::{AllocationEntry, AllocationStatus};
pub use checkbook::{CheckbookEntry, CheckbookStatus};
pub use queue_root::QueueRootEntry;
pub use withdraw::{
    DisplayStatus, ExecuteStatus, FallbackState, HookStatus, ManualResolution, PayoutStatus,
    ProofStatus, WithdrawRequestEntry,
};
