use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::buf::Buf32;

/// A chain-tagged address: the SLIP-44 id of the chain plus the address data
/// widened to 32 bytes.
///
/// This is the only address form used internally; chain-local encodings are
/// converted at the system boundary.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash,
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Arbitrary,
)]
pub struct UniversalAddress {
    #[serde(rename = "chainId", alias = "chain_id")]
    chain_id: u32,
    data: Buf32,
}

impl UniversalAddress {
    pub fn new(chain_id: u32, data: Buf32) -> Self {
        Self { chain_id, data }
    }

    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    pub fn data(&self) -> &Buf32 {
        &self.data
    }

    /// Fixed-width key form used by owner-scoped indexes: chain id (BE) then
    /// the 32 data bytes.
    pub fn to_key_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..4].copy_from_slice(&self.chain_id.to_be_bytes());
        out[4..].copy_from_slice(self.data.as_slice());
        out
    }
}

impl fmt::Display for UniversalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_camel_case() {
        let addr = UniversalAddress::new(714, Buf32::from([0xaau8; 32]));
        let js = serde_json::to_value(&addr).unwrap();
        assert_eq!(js["chainId"], 714);

        // Legacy snake_case payloads still decode.
        let legacy = serde_json::json!({
            "chain_id": 714,
            "data": addr.data().to_hex(),
        });
        let back: UniversalAddress = serde_json::from_value(legacy).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_key_bytes_ordering() {
        let a = UniversalAddress::new(60, Buf32::from([1u8; 32]));
        let b = UniversalAddress::new(714, Buf32::from([1u8; 32]));
        assert!(a.to_key_bytes() < b.to_key_bytes());
    }
}
