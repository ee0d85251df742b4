use std::{fmt, str::FromStr};

use alloy_primitives::FixedBytes;
use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::errors::PrimitivesError;

/// 32-byte buf, useful for hashes, commitments and nullifiers.
///
/// Serialized as `0x`-prefixed lowercase hex (66 chars) on the wire, raw
/// bytes under borsh.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Buf32(pub FixedBytes<32>);

impl Buf32 {
    pub fn zero() -> Self {
        Self(FixedBytes::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == FixedBytes::ZERO
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Parses a hex string, with or without the `0x` prefix.  Short inputs
    /// are left-padded with zeroes, matching how on-chain addresses narrower
    /// than 32 bytes are widened.
    pub fn from_hex(s: &str) -> Result<Self, PrimitivesError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        if stripped.len() > 64 || stripped.len() % 2 != 0 {
            return Err(PrimitivesError::InvalidHexBuf(s.to_owned()));
        }
        let bytes = hex::decode(stripped)
            .map_err(|_| PrimitivesError::InvalidHexBuf(s.to_owned()))?;
        let mut buf = [0u8; 32];
        buf[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(buf.into()))
    }

    /// The canonical `0x`-prefixed 66-char hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_slice()))
    }
}

impl From<[u8; 32]> for Buf32 {
    fn from(value: [u8; 32]) -> Self {
        Self(value.into())
    }
}

impl From<FixedBytes<32>> for Buf32 {
    fn from(value: FixedBytes<32>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Buf32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Buf32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Buf32 {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl BorshSerialize for Buf32 {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.0.as_slice())
    }
}

impl BorshDeserialize for Buf32 {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut array = [0u8; 32];
        reader.read_exact(&mut array)?;
        Ok(Self(array.into()))
    }
}

impl serde::Serialize for Buf32 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Buf32 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl<'a> Arbitrary<'a> for Buf32 {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let data: [u8; 32] = u.arbitrary()?;
        Ok(Self(data.into()))
    }
}
