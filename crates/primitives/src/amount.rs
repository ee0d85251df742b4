use std::{fmt, iter::Sum, str::FromStr};

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use ethnum::U256;

use crate::errors::PrimitivesError;

/// A token amount in the 18-decimal canonical form.
///
/// Amounts travel as decimal strings on the wire and are never represented
/// as binary floats anywhere in the system.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::ZERO);

    pub fn from_u128(v: u128) -> Self {
        Self(U256::from(v))
    }

    pub fn from_dec_str(s: &str) -> Result<Self, PrimitivesError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PrimitivesError::InvalidAmount(s.to_owned()));
        }
        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|_| PrimitivesError::InvalidAmount(s.to_owned()))
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| {
            acc.checked_add(a).expect("amount sum overflow")
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dec_str(s)
    }
}

impl BorshSerialize for Amount {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.0.to_le_bytes())
    }
}

impl BorshDeserialize for Amount {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        Ok(Self(U256::from_le_bytes(bytes)))
    }
}

impl serde::Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Chain scanners emit decimal strings; a handful of legacy payloads
        // carry small amounts as bare JSON integers.  Accept both.
        struct AmountVisitor;

        impl serde::de::Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or unsigned integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::from_dec_str(v).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(U256::from(v)))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl<'a> Arbitrary<'a> for Amount {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let v: u128 = u.arbitrary()?;
        Ok(Amount::from_u128(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dec_str_roundtrip() {
        let a = Amount::from_dec_str("1000000000000000000").unwrap();
        assert_eq!(a.to_string(), "1000000000000000000");
    }

    #[test]
    fn test_rejects_nondigits() {
        assert!(Amount::from_dec_str("12.5").is_err());
        assert!(Amount::from_dec_str("").is_err());
        assert!(Amount::from_dec_str("0x10").is_err());
    }

    #[test]
    fn test_serde_accepts_string_and_int() {
        let a: Amount = serde_json::from_str("\"600\"").unwrap();
        let b: Amount = serde_json::from_str("600").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"600\"");
    }

    #[test]
    fn test_checked_math() {
        let a = Amount::from_u128(600);
        let b = Amount::from_u128(400);
        assert_eq!(a.checked_add(b).unwrap(), Amount::from_u128(1000));
        assert!(b.checked_sub(a).is_none());
    }
}
