use zkpay_db::traits::AllocationDatabase;
use zkpay_primitives::buf::Buf32;
use zkpay_state::{AllocationEntry, AllocationStatus};

use crate::exec::inst_ops;

inst_ops! {
    (AllocationOps => zkpay_db::traits::AllocationDatabase) {
        fn create_allocations(entries: Vec<AllocationEntry>) -> Vec<AllocationEntry> {
            move |db| db.create_allocations(entries)
        }
        fn get_allocation(id: String) -> Option<AllocationEntry> {
            move |db| db.get_allocation(&id)
        }
        fn get_allocations_by_checkbook(checkbook_id: String) -> Vec<AllocationEntry> {
            move |db| db.get_allocations_by_checkbook(&checkbook_id)
        }
        fn get_allocation_by_nullifier(nullifier: Buf32) -> Option<AllocationEntry> {
            move |db| db.get_allocation_by_nullifier(&nullifier)
        }
        fn get_allocations_by_withdraw_request(withdraw_request_id: String) -> Vec<AllocationEntry> {
            move |db| db.get_allocations_by_withdraw_request(&withdraw_request_id)
        }
        fn get_allocations_by_legacy_request(request_id: Buf32) -> Vec<AllocationEntry> {
            move |db| db.get_allocations_by_legacy_request(&request_id)
        }
        fn lock_for_withdrawal(ids: Vec<String>, withdraw_request_id: String) -> usize {
            move |db| db.lock_for_withdrawal(&ids, &withdraw_request_id)
        }
        fn release_allocations(ids: Vec<String>) -> usize {
            move |db| db.release_allocations(&ids)
        }
        fn mark_used(ids: Vec<String>) -> usize {
            move |db| db.mark_used(&ids)
        }
        fn set_allocation_status(id: String, status: AllocationStatus) -> AllocationEntry {
            move |db| db.set_allocation_status(&id, status)
        }
    }
}
