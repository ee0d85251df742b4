use serde::{Deserialize, Serialize};
use serde_json::Value;
use zkpay_primitives::{buf::Buf32, slip44};

use crate::errors::EventDecodeError;

/// The envelope every chain event shares, after normalization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "chainId")]
    pub chain_id: u32,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(rename = "contractName")]
    pub contract_name: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: Buf32,
    #[serde(rename = "logIndex")]
    pub log_index: u64,
    #[serde(rename = "blockTimestamp")]
    pub block_timestamp: u64,
    #[serde(rename = "eventData", default)]
    pub event_data: Value,
}

/// Decodes a raw bus payload into an [`EventEnvelope`].
///
/// This is the one place legacy compatibility is handled:
///
/// - `txHash` is accepted as an alias for `transactionHash`, and wins when
///   both are present.
/// - `chain_id` is normalized to SLIP-44; inputs may already be normalized.
pub fn decode_envelope(payload: &[u8]) -> Result<EventEnvelope, EventDecodeError> {
    let mut raw: Value = serde_json::from_slice(payload)?;
    normalize_envelope(&mut raw);
    let mut env: EventEnvelope = serde_json::from_value(raw)?;
    env.chain_id = slip44::normalize_chain_id(env.chain_id);
    Ok(env)
}

/// Rewrites legacy aliases in place before typed decoding.
fn normalize_envelope(raw: &mut Value) {
    let Some(obj) = raw.as_object_mut() else {
        return;
    };
    if let Some(tx) = obj.remove("txHash") {
        obj.insert("transactionHash".to_owned(), tx);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn base_envelope() -> Value {
        json!({
            "chainId": 714,
            "contractAddress": "0x00000000000000000000000000000000000000aa",
            "contractName": "Treasury",
            "eventName": "DepositReceived",
            "blockNumber": 100,
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "logIndex": 3,
            "blockTimestamp": 1700000000,
            "eventData": {},
        })
    }

    #[test]
    fn test_decode_plain() {
        let raw = serde_json::to_vec(&base_envelope()).unwrap();
        let env = decode_envelope(&raw).unwrap();
        assert_eq!(env.chain_id, 714);
        assert_eq!(env.event_name, "DepositReceived");
        assert_eq!(env.log_index, 3);
    }

    #[test]
    fn test_tx_hash_alias_accepted() {
        let mut v = base_envelope();
        let obj = v.as_object_mut().unwrap();
        obj.remove("transactionHash");
        obj.insert("txHash".into(), json!(format!("0x{}", "22".repeat(32))));
        let env = decode_envelope(&serde_json::to_vec(&v).unwrap()).unwrap();
        assert_eq!(env.transaction_hash, Buf32::from([0x22u8; 32]));
    }

    #[test]
    fn test_tx_hash_wins_over_transaction_hash() {
        let mut v = base_envelope();
        v.as_object_mut()
            .unwrap()
            .insert("txHash".into(), json!(format!("0x{}", "33".repeat(32))));
        let env = decode_envelope(&serde_json::to_vec(&v).unwrap()).unwrap();
        assert_eq!(env.transaction_hash, Buf32::from([0x33u8; 32]));
    }

    #[test]
    fn test_evm_chain_id_normalized() {
        let mut v = base_envelope();
        v.as_object_mut().unwrap().insert("chainId".into(), json!(56));
        let env = decode_envelope(&serde_json::to_vec(&v).unwrap()).unwrap();
        assert_eq!(env.chain_id, slip44::BSC);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            decode_envelope(b"not json"),
            Err(EventDecodeError::Malformed(_))
        ));
    }
}
