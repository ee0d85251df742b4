use zkpay_db::{traits::QueueRootDatabase, types::InsertOutcome};
use zkpay_primitives::buf::Buf32;
use zkpay_state::QueueRootEntry;

use crate::exec::inst_ops;

inst_ops! {
    (QueueRootOps => zkpay_db::traits::QueueRootDatabase) {
        fn create_root(entry: QueueRootEntry) -> InsertOutcome {
            move |db| db.create_root(entry)
        }
        fn is_known_root(chain_id: u32, root: Buf32) -> bool {
            move |db| db.is_known_root(chain_id, &root)
        }
        fn get_root_by_commitment(commitment: Buf32) -> Option<QueueRootEntry> {
            move |db| db.get_root_by_commitment(&commitment)
        }
        fn find_by_previous_root(chain_id: u32, previous_root: Buf32) -> Option<QueueRootEntry> {
            move |db| db.find_by_previous_root(chain_id, &previous_root)
        }
        fn find_recent_roots(chain_id: u32, limit: usize) -> Vec<QueueRootEntry> {
            move |db| db.find_recent_roots(chain_id, limit)
        }
    }
}
