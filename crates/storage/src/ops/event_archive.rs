use zkpay_db::{
    traits::EventArchiveDatabase,
    types::{ArchiveKind, ArchivedEventEntry, EventKey, InsertOutcome},
};

use crate::exec::inst_ops;

inst_ops! {
    (EventArchiveOps => zkpay_db::traits::EventArchiveDatabase) {
        fn insert_event(kind: ArchiveKind, key: EventKey, entry: ArchivedEventEntry) -> InsertOutcome {
            move |db| db.insert_event(kind, key, entry)
        }
        fn get_event(kind: ArchiveKind, key: EventKey) -> Option<ArchivedEventEntry> {
            move |db| db.get_event(kind, &key)
        }
    }
}
