use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use zkpay_primitives::buf::Buf32;

/// One node in the commitment-root chain of a single chain.
///
/// Roots form a linked list through `previous_root`; gaps are tolerated
/// because the scanner can back-fill older segments out of order.
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
    Arbitrary,
)]
pub struct QueueRootEntry {
    /// SLIP-44 chain id this root belongs to.
    pub chain_id: u32,

    /// The root itself; unique per chain.
    pub root: Buf32,

    /// Predecessor root, if the contract reported one.
    pub previous_root: Option<Buf32>,

    /// The commitment whose insertion produced this root.
    pub created_by_commitment: Buf32,

    pub block_number: u64,
    pub tx_hash: Buf32,

    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borsh_roundtrip() {
        let entry = QueueRootEntry {
            chain_id: 714,
            root: Buf32::from([2u8; 32]),
            previous_root: Some(Buf32::from([1u8; 32])),
            created_by_commitment: Buf32::from([3u8; 32]),
            block_number: 42,
            tx_hash: Buf32::from([4u8; 32]),
            created_at: 1,
        };
        let bytes = borsh::to_vec(&entry).unwrap();
        let back: QueueRootEntry = borsh::from_slice(&bytes).unwrap();
        assert_eq!(back, entry);
    }
}
