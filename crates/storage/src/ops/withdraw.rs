use zkpay_db::{
    traits::WithdrawRequestDatabase,
    types::{
        ExecuteStatusUpdate, FallbackUpdate, HookStatusUpdate, Page, Paginated,
        PayoutStatusUpdate, ProofStatusUpdate, UpdateOutcome,
    },
};
use zkpay_primitives::{address::UniversalAddress, buf::Buf32};
use zkpay_state::WithdrawRequestEntry;

use crate::exec::inst_ops;

inst_ops! {
    (WithdrawOps => zkpay_db::traits::WithdrawRequestDatabase) {
        fn create_request(entry: WithdrawRequestEntry) -> WithdrawRequestEntry {
            move |db| db.create_request(entry)
        }
        fn get_request(id: String) -> Option<WithdrawRequestEntry> {
            move |db| db.get_request(&id)
        }
        fn get_request_by_nullifier(nullifier: Buf32) -> Option<WithdrawRequestEntry> {
            move |db| db.get_request_by_nullifier(&nullifier)
        }
        fn get_request_by_legacy_id(request_id: Buf32) -> Option<WithdrawRequestEntry> {
            move |db| db.get_request_by_legacy_id(&request_id)
        }
        fn update_proof_status(id: String, update: ProofStatusUpdate) -> () {
            move |db| db.update_proof_status(&id, update)
        }
        fn update_execute_status(id: String, update: ExecuteStatusUpdate) -> UpdateOutcome {
            move |db| db.update_execute_status(&id, update)
        }
        fn update_payout_status(id: String, update: PayoutStatusUpdate) -> () {
            move |db| db.update_payout_status(&id, update)
        }
        fn update_hook_status(id: String, update: HookStatusUpdate) -> () {
            move |db| db.update_hook_status(&id, update)
        }
        fn update_fallback(id: String, update: FallbackUpdate) -> () {
            move |db| db.update_fallback(&id, update)
        }
        fn update_withdraw_nullifier(id: String, nullifier: Buf32) -> () {
            move |db| db.update_withdraw_nullifier(&id, nullifier)
        }
        fn mark_resolved(id: String, resolver: String, note: Option<String>) -> () {
            move |db| db.mark_resolved(&id, resolver, note)
        }
        fn list_requests_by_owner(owner: UniversalAddress, page: Page) -> Paginated<WithdrawRequestEntry> {
            move |db| db.list_requests_by_owner(&owner, page)
        }
    }
}
