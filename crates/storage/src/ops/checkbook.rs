use zkpay_db::{
    traits::CheckbookDatabase,
    types::{DepositRecordUpdate, Page, Paginated, UpdateOutcome},
};
use zkpay_primitives::{address::UniversalAddress, buf::Buf32};
use zkpay_state::{CheckbookEntry, CheckbookStatus};

use crate::exec::inst_ops;

inst_ops! {
    (CheckbookOps => zkpay_db::traits::CheckbookDatabase) {
        fn create_checkbook(entry: CheckbookEntry) -> CheckbookEntry {
            move |db| db.create_checkbook(entry)
        }
        fn get_checkbook(id: String) -> Option<CheckbookEntry> {
            move |db| db.get_checkbook(&id)
        }
        fn get_checkbook_by_deposit(chain_id: u32, local_deposit_id: u64) -> Option<CheckbookEntry> {
            move |db| db.get_checkbook_by_deposit(chain_id, local_deposit_id)
        }
        fn get_checkbook_by_commitment(commitment: Buf32) -> Option<CheckbookEntry> {
            move |db| db.get_checkbook_by_commitment(&commitment)
        }
        fn get_checkbook_by_deposit_tx(tx_hash: Buf32) -> Option<CheckbookEntry> {
            move |db| db.get_checkbook_by_deposit_tx(&tx_hash)
        }
        fn update_checkbook(entry: CheckbookEntry) -> () {
            move |db| db.update_checkbook(entry)
        }
        fn promote_checkbook(id: String, target: CheckbookStatus) -> UpdateOutcome {
            move |db| db.promote_checkbook(&id, target)
        }
        fn record_deposit(id: String, update: DepositRecordUpdate, target: CheckbookStatus) -> CheckbookEntry {
            move |db| db.record_deposit(&id, update, target)
        }
        fn set_commitment(id: String, commitment: Buf32, target: CheckbookStatus) -> UpdateOutcome {
            move |db| db.set_commitment(&id, commitment, target)
        }
        fn set_proof_artifacts(id: String, proof: Vec<u8>, public_values: Vec<u8>, target: CheckbookStatus) -> UpdateOutcome {
            move |db| db.set_proof_artifacts(&id, proof, public_values, target)
        }
        fn list_checkbooks_by_owner(owner: UniversalAddress, page: Page) -> Paginated<CheckbookEntry> {
            move |db| db.list_checkbooks_by_owner(&owner, page)
        }
    }
}
