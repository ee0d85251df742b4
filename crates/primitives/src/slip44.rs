//! SLIP-44 chain id normalization.
//!
//! Every chain id that enters the coordinator is normalized to its SLIP-44
//! coin type here.  Inputs may already be SLIP-44 (the scanner normalizes
//! most subjects) or a raw EVM chain id from a legacy envelope; the mapping
//! is idempotent either way.

/// SLIP-44 coin type for Ethereum mainnet.
pub const ETHEREUM: u32 = 60;
/// SLIP-44 coin type for TRON.
pub const TRON: u32 = 195;
/// SLIP-44 coin type for Optimism.
pub const OPTIMISM: u32 = 614;
/// SLIP-44 coin type for BNB Smart Chain.
pub const BSC: u32 = 714;
/// SLIP-44 coin type for Polygon.
pub const POLYGON: u32 = 966;
/// SLIP-44 coin type for Arbitrum.
pub const ARBITRUM: u32 = 9001;

/// (evm chain id, slip-44 coin type) pairs for the supported networks.
const EVM_TO_SLIP44: &[(u32, u32)] = &[
    (1, ETHEREUM),
    (10, OPTIMISM),
    (56, BSC),
    (137, POLYGON),
    (42161, ARBITRUM),
    // TRON's EVM-style network id, used by some scanner deployments.
    (728126428, TRON),
];

/// Normalizes a chain id to SLIP-44 form.  Already-normalized ids pass
/// through unchanged, as do ids for chains outside the mapping table.
pub fn normalize_chain_id(chain_id: u32) -> u32 {
    if EVM_TO_SLIP44.iter().any(|(_, s)| *s == chain_id) {
        return chain_id;
    }
    EVM_TO_SLIP44
        .iter()
        .find(|(evm, _)| *evm == chain_id)
        .map(|(_, s)| *s)
        .unwrap_or(chain_id)
}

/// Resolves a lowercase chain alias (as used in bus subjects) to SLIP-44.
pub fn alias_to_slip44(alias: &str) -> Option<u32> {
    match alias {
        "eth" | "ethereum" => Some(ETHEREUM),
        "tron" => Some(TRON),
        "optimism" => Some(OPTIMISM),
        "bsc" => Some(BSC),
        "polygon" => Some(POLYGON),
        "arbitrum" => Some(ARBITRUM),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_maps_evm_ids() {
        assert_eq!(normalize_chain_id(56), BSC);
        assert_eq!(normalize_chain_id(1), ETHEREUM);
        assert_eq!(normalize_chain_id(728126428), TRON);
    }

    #[test]
    fn test_normalize_idempotent() {
        for id in [ETHEREUM, TRON, OPTIMISM, BSC, POLYGON, ARBITRUM] {
            assert_eq!(normalize_chain_id(normalize_chain_id(id)), id);
            assert_eq!(normalize_chain_id(id), id);
        }
    }

    #[test]
    fn test_unknown_passes_through() {
        assert_eq!(normalize_chain_id(123456), 123456);
    }

    #[test]
    fn test_alias_lookup() {
        assert_eq!(alias_to_slip44("bsc"), Some(BSC));
        assert_eq!(alias_to_slip44("nope"), None);
    }
}
