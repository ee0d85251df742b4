//! Per-event `event_data` payloads.
//!
//! Field names follow the contracts' camelCase ABI names; amounts stay
//! decimal strings all the way into [`Amount`].

use serde::{Deserialize, Serialize};
use zkpay_primitives::{address::UniversalAddress, amount::Amount, buf::Buf32};

use crate::{envelope::EventEnvelope, errors::EventDecodeError};

/// A typed view over an envelope's `event_data`.
pub trait ChainEvent: for<'de> Deserialize<'de> {
    const CONTRACT: &'static str;
    const NAME: &'static str;

    /// Decodes the payload after checking the envelope routing fields match
    /// this event type.
    fn decode(env: &EventEnvelope) -> Result<Self, EventDecodeError> {
        if env.event_name != Self::NAME {
            return Err(EventDecodeError::WrongEvent {
                expected: Self::NAME,
                got: env.event_name.clone(),
            });
        }
        if env.contract_name != Self::CONTRACT {
            return Err(EventDecodeError::WrongContract {
                expected: Self::CONTRACT,
                got: env.contract_name.clone(),
            });
        }
        if env.event_data.is_null() {
            return Err(EventDecodeError::MissingEventData);
        }
        Ok(serde_json::from_value(env.event_data.clone())?)
    }
}

macro_rules! impl_chain_event {
    ($ty:ty, $contract:literal, $name:literal) => {
        impl ChainEvent for $ty {
            const CONTRACT: &'static str = $contract;
            const NAME: &'static str = $name;
        }
    };
}

/// Payout/hook worker routing reported by the contracts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WorkerType {
    Direct,
    Uniswap,
    Debridge,
}

impl WorkerType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(WorkerType::Direct),
            1 => Some(WorkerType::Uniswap),
            2 => Some(WorkerType::Debridge),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositReceived {
    pub depositor: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "localDepositId")]
    pub local_deposit_id: u64,
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<u32>,
    #[serde(rename = "promoteCode", default)]
    pub promote_code: Option<String>,
}
impl_chain_event!(DepositReceived, "Treasury", "DepositReceived");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositRecorded {
    #[serde(rename = "localDepositId")]
    pub local_deposit_id: u64,
    /// keccak256 of the token symbol; resolved through the token-key
    /// registry before anything is persisted.
    #[serde(rename = "tokenKey")]
    pub token_key_hash: Buf32,
    #[serde(rename = "tokenId", default)]
    pub token_id: Option<u64>,
    pub owner: UniversalAddress,
    #[serde(rename = "grossAmount")]
    pub gross_amount: Amount,
    #[serde(rename = "feeTotalLocked")]
    pub fee_total_locked: Amount,
    #[serde(rename = "allocatableAmount")]
    pub allocatable_amount: Amount,
    #[serde(rename = "promoteCode", default)]
    pub promote_code: Option<String>,
    #[serde(rename = "addressRank", default)]
    pub address_rank: Option<u32>,
    #[serde(rename = "depositTxHash", default)]
    pub deposit_tx_hash: Option<Buf32>,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}
impl_chain_event!(DepositRecorded, "ZKPayProxy", "DepositRecorded");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositUsed {
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<u32>,
    #[serde(rename = "localDepositId")]
    pub local_deposit_id: u64,
    pub commitment: Buf32,
    #[serde(rename = "promoteCode", default)]
    pub promote_code: Option<String>,
}
impl_chain_event!(DepositUsed, "ZKPayProxy", "DepositUsed");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitmentRootUpdated {
    #[serde(rename = "oldRoot")]
    pub old_root: Buf32,
    pub commitment: Buf32,
    #[serde(rename = "newRoot")]
    pub new_root: Buf32,
}
impl_chain_event!(CommitmentRootUpdated, "ZKPayProxy", "CommitmentRootUpdated");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawRequested {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub recipient: Buf32,
    #[serde(rename = "tokenId", default)]
    pub token_id: Option<u64>,
    pub amount: Amount,
}
impl_chain_event!(WithdrawRequested, "ZKPayProxy", "WithdrawRequested");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawExecuted {
    pub recipient: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
}
impl_chain_event!(WithdrawExecuted, "Treasury", "WithdrawExecuted");

/// The intent manager's execution report; informational alongside the
/// treasury's [`WithdrawExecuted`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentWithdrawExecuted {
    #[serde(rename = "workerType")]
    pub worker_type: u8,
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
impl_chain_event!(IntentWithdrawExecuted, "IntentManager", "WithdrawExecuted");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayoutExecuted {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub beneficiary: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "workerType", default)]
    pub worker_type: Option<u8>,
    #[serde(rename = "actualOutput", default)]
    pub actual_output: Option<Amount>,
}
impl_chain_event!(PayoutExecuted, "Treasury", "PayoutExecuted");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayoutFailed {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub beneficiary: Buf32,
    #[serde(rename = "workerType", default)]
    pub worker_type: Option<u8>,
    #[serde(rename = "errorReason")]
    pub error_reason: String,
}
impl_chain_event!(PayoutFailed, "Treasury", "PayoutFailed");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HookExecuted {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub beneficiary: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "errorData", default)]
    pub error_data: Option<String>,
}
impl_chain_event!(HookExecuted, "IntentManager", "HookExecuted");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HookFailed {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub beneficiary: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "errorData", default)]
    pub error_data: Option<String>,
}
impl_chain_event!(HookFailed, "IntentManager", "HookFailed");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackTransferred {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub beneficiary: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "errorReason", default)]
    pub error_reason: Option<String>,
}
impl_chain_event!(FallbackTransferred, "IntentManager", "FallbackTransferred");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackFailed {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub beneficiary: Buf32,
    pub token: Buf32,
    pub amount: Amount,
    #[serde(rename = "errorReason", default)]
    pub error_reason: Option<String>,
}
impl_chain_event!(FallbackFailed, "IntentManager", "FallbackFailed");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayoutRetryRecordCreated {
    #[serde(rename = "recordId")]
    pub record_id: u64,
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    #[serde(rename = "errorReason", default)]
    pub error_reason: Option<String>,
}
impl_chain_event!(PayoutRetryRecordCreated, "Treasury", "PayoutRetryRecordCreated");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackRetryRecordCreated {
    #[serde(rename = "recordId")]
    pub record_id: u64,
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    #[serde(rename = "errorReason", default)]
    pub error_reason: Option<String>,
}
impl_chain_event!(
    FallbackRetryRecordCreated,
    "Treasury",
    "FallbackRetryRecordCreated"
);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManuallyResolved {
    #[serde(rename = "requestId")]
    pub request_id: Buf32,
    pub resolver: String,
    #[serde(default)]
    pub note: Option<String>,
}
impl_chain_event!(ManuallyResolved, "ZKPayProxy", "ManuallyResolved");

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::envelope::decode_envelope;

    fn envelope_for(contract: &str, event: &str, data: serde_json::Value) -> EventEnvelope {
        let raw = json!({
            "chainId": 714,
            "contractAddress": "0x00000000000000000000000000000000000000aa",
            "contractName": contract,
            "eventName": event,
            "blockNumber": 10,
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "logIndex": 0,
            "blockTimestamp": 1700000000,
            "eventData": data,
        });
        decode_envelope(&serde_json::to_vec(&raw).unwrap()).unwrap()
    }

    #[test]
    fn test_decode_deposit_received() {
        let env = envelope_for(
            "Treasury",
            "DepositReceived",
            json!({
                "depositor": format!("0x{}", "0a".repeat(20)),
                "token": format!("0x{}", "0b".repeat(20)),
                "amount": "1000000000000000000",
                "localDepositId": 1001,
            }),
        );
        let ev = DepositReceived::decode(&env).unwrap();
        assert_eq!(ev.local_deposit_id, 1001);
        assert_eq!(ev.amount.to_string(), "1000000000000000000");
        assert!(ev.promote_code.is_none());
    }

    #[test]
    fn test_wrong_event_name_rejected() {
        let env = envelope_for("Treasury", "DepositReceived", json!({}));
        let err = CommitmentRootUpdated::decode(&env).unwrap_err();
        assert!(matches!(err, EventDecodeError::WrongEvent { .. }));
    }

    #[test]
    fn test_same_name_different_contract_rejected() {
        // Treasury and IntentManager both emit WithdrawExecuted; the
        // contract segment must disambiguate.
        let env = envelope_for(
            "IntentManager",
            "WithdrawExecuted",
            json!({ "workerType": 1, "success": true }),
        );
        assert!(matches!(
            WithdrawExecuted::decode(&env),
            Err(EventDecodeError::WrongContract { .. })
        ));
        let ev = IntentWithdrawExecuted::decode(&env).unwrap();
        assert_eq!(WorkerType::from_u8(ev.worker_type), Some(WorkerType::Uniswap));
    }

    #[test]
    fn test_amount_survives_roundtrip_as_string() {
        let env = envelope_for(
            "ZKPayProxy",
            "WithdrawRequested",
            json!({
                "requestId": format!("0x{}", "cd".repeat(32)),
                "recipient": format!("0x{}", "0c".repeat(20)),
                "amount": "123456789123456789123456789",
            }),
        );
        let ev = WithdrawRequested::decode(&env).unwrap();
        let back = serde_json::to_value(&ev).unwrap();
        assert_eq!(back["amount"], "123456789123456789123456789");
    }
}
