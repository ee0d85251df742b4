use std::collections::HashMap;

use alloy_primitives::keccak256;

use crate::buf::Buf32;

/// Token symbol the coordinator falls back to when a deposit is seen before
/// its record event arrives.
pub const DEFAULT_TOKEN_KEY: &str = "USDT";

/// Boot-time map from keccak256(symbol) to the original symbol string.
///
/// Contracts emit token keys hashed; the registry recovers the symbol before
/// it is persisted.  Built once at startup from the configured symbol list
/// and read-only afterwards, so handlers can share it behind an `Arc` with
/// no locking.
#[derive(Debug, Clone)]
pub struct TokenKeyRegistry {
    by_hash: HashMap<Buf32, String>,
}

impl TokenKeyRegistry {
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let by_hash = symbols
            .into_iter()
            .map(|s| {
                let sym = s.as_ref().to_owned();
                (hash_token_key(&sym), sym)
            })
            .collect();
        Self { by_hash }
    }

    /// Recovers the symbol a hashed token key was derived from, if known.
    pub fn resolve(&self, hash: &Buf32) -> Option<&str> {
        self.by_hash.get(hash).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

/// keccak256 of the raw symbol bytes, matching the contracts' encoding.
pub fn hash_token_key(symbol: &str) -> Buf32 {
    Buf32(keccak256(symbol.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_symbol() {
        let reg = TokenKeyRegistry::from_symbols(["USDT", "USDC", "WBNB"]);
        assert_eq!(reg.len(), 3);
        let h = hash_token_key("USDC");
        assert_eq!(reg.resolve(&h), Some("USDC"));
    }

    #[test]
    fn test_unknown_hash_misses() {
        let reg = TokenKeyRegistry::from_symbols(["USDT"]);
        assert_eq!(reg.resolve(&Buf32::from([9u8; 32])), None);
    }
}
