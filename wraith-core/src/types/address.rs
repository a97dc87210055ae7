//! Address types for WRAITH.
//!
//! - [`MetaAddress`]: The ERC-5564 stealth meta-address a recipient publishes
//! - [`Address`]: A ledger address produced by an address encoder
//! - [`GeneratedStealthAddress`]: Everything a sender needs after derivation

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::{AnnouncedStealth, CurvePublicKey, StealthMetadata};
use crate::constants::{
    COMPRESSED_PUBLIC_KEY_SIZE, ETH_ADDRESS_SIZE, MAX_ADDRESS_SIZE, META_ADDRESS_PREFIX,
    META_ADDRESS_SIZE,
};
use crate::error::{Result, StealthError};

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A stealth meta-address that is published for receiving private payments.
///
/// Senders use this to create stealth addresses.
///
/// # Format
/// ```text
/// st:eth:0x<spending_pk (33 bytes)><viewing_pk (33 bytes)>
/// ```
///
/// # Example
/// ```ignore
/// use wraith_core::MetaAddress;
///
/// let meta = MetaAddress::new(spending_pk, viewing_pk);
/// let uri = meta.to_string();
/// assert_eq!(uri.parse::<MetaAddress>()?, meta);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MetaAddress {
    /// Spending public key - used to derive stealth addresses
    pub spending_pk: CurvePublicKey,
    /// Viewing public key - used for scanning announcements
    pub viewing_pk: CurvePublicKey,
}

impl MetaAddress {
    /// Creates a new meta-address.
    pub fn new(spending_pk: CurvePublicKey, viewing_pk: CurvePublicKey) -> Self {
        Self {
            spending_pk,
            viewing_pk,
        }
    }

    /// Validates the meta-address structure.
    ///
    /// Both keys already carry a valid compressed prefix; this rejects a
    /// meta-address that reuses one key for both roles.
    pub fn validate(&self) -> Result<()> {
        if self.spending_pk == self.viewing_pk {
            return Err(StealthError::InvalidMetaAddress(
                "spending and viewing keys must differ".into(),
            ));
        }
        Ok(())
    }

    /// Serializes to the raw 66-byte form: spending_pk || viewing_pk.
    pub fn to_bytes(&self) -> [u8; META_ADDRESS_SIZE] {
        let mut bytes = [0u8; META_ADDRESS_SIZE];
        bytes[..COMPRESSED_PUBLIC_KEY_SIZE].copy_from_slice(self.spending_pk.as_bytes());
        bytes[COMPRESSED_PUBLIC_KEY_SIZE..].copy_from_slice(self.viewing_pk.as_bytes());
        bytes
    }

    /// Deserializes from the raw 66-byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_ADDRESS_SIZE {
            return Err(StealthError::InvalidMetaAddress(format!(
                "expected {} bytes, got {}",
                META_ADDRESS_SIZE,
                bytes.len()
            )));
        }

        let spending_pk = CurvePublicKey::from_bytes(&bytes[..COMPRESSED_PUBLIC_KEY_SIZE])
            .map_err(|e| StealthError::InvalidMetaAddress(format!("spending key: {e}")))?;
        let viewing_pk = CurvePublicKey::from_bytes(&bytes[COMPRESSED_PUBLIC_KEY_SIZE..])
            .map_err(|e| StealthError::InvalidMetaAddress(format!("viewing key: {e}")))?;

        let meta = Self::new(spending_pk, viewing_pk);
        meta.validate()?;
        Ok(meta)
    }
}

impl std::fmt::Display for MetaAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", META_ADDRESS_PREFIX, hex::encode(self.to_bytes()))
    }
}

impl FromStr for MetaAddress {
    type Err = StealthError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s.strip_prefix(META_ADDRESS_PREFIX).ok_or_else(|| {
            StealthError::InvalidMetaAddress(format!("missing `{META_ADDRESS_PREFIX}` prefix"))
        })?;
        let bytes = hex::decode(body)?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for MetaAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MetaAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A ledger address as produced by an address encoder.
///
/// Opaque to the protocol: only equality matters during scanning. A 20-byte
/// address is displayed with its EIP-55 checksum.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    bytes: Vec<u8>,
}

impl Address {
    /// Creates an address from raw bytes.
    ///
    /// # Errors
    /// Returns `InvalidAddress` if empty or longer than [`MAX_ADDRESS_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > MAX_ADDRESS_SIZE {
            return Err(StealthError::InvalidAddress(format!(
                "length must be 1..={}, got {}",
                MAX_ADDRESS_SIZE,
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Creates an Ethereum-sized address from a fixed-size array.
    pub fn from_eth(bytes: [u8; ETH_ADDRESS_SIZE]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the address length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: empty addresses cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the hex string with 0x prefix, EIP-55 checksummed for 20-byte addresses.
    pub fn to_checksum_string(&self) -> String {
        if self.bytes.len() != ETH_ADDRESS_SIZE {
            return format!("0x{}", hex::encode(&self.bytes));
        }

        let lower = hex::encode(&self.bytes);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Parses from hex string (with or without 0x prefix, any case).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_checksum_string())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum_string())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATED STEALTH ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete result of stealth address generation.
///
/// Contains everything the sender needs to make a payment
/// and everything for the announcement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedStealthAddress {
    /// The one-time address to send funds to
    pub stealth_address: Address,
    /// The ephemeral public key (for the announcement)
    pub ephemeral_public_key: CurvePublicKey,
    /// View tag for efficient scanning
    pub view_tag: u8,
    /// The stealth public key (for verification)
    pub stealth_public_key: CurvePublicKey,
}

impl GeneratedStealthAddress {
    /// Returns the metadata to publish alongside the payment.
    pub fn metadata(&self) -> StealthMetadata {
        StealthMetadata::new(self.ephemeral_public_key, self.view_tag)
    }

    /// Builds the (unsequenced) announcement for this payment.
    ///
    /// The sequence index is assigned by the log on append.
    pub fn into_announcement(self, payload: Vec<u8>) -> AnnouncedStealth {
        let metadata = self.metadata();
        AnnouncedStealth::new(self.stealth_address, metadata, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn key(prefix: u8, fill: u8) -> CurvePublicKey {
        let mut bytes = [fill; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = prefix;
        CurvePublicKey::from_array(bytes).unwrap()
    }

    #[test]
    fn test_meta_address_string_roundtrip() {
        let meta = MetaAddress::new(key(0x02, 0xAA), key(0x03, 0xBB));
        let s = meta.to_string();

        assert!(s.starts_with(META_ADDRESS_PREFIX));
        assert_eq!(s.len(), META_ADDRESS_PREFIX.len() + 2 * META_ADDRESS_SIZE);
        assert_eq!(s.parse::<MetaAddress>().unwrap(), meta);
    }

    #[test_case("0x1234" ; "missing prefix")]
    #[test_case("st:eth:0x1234" ; "too short")]
    #[test_case("st:eth:0xzz" ; "not hex")]
    #[test_case("st:sol:0x02aa" ; "wrong chain")]
    fn test_meta_address_parse_errors(input: &str) {
        assert!(input.parse::<MetaAddress>().is_err());
    }

    #[test]
    fn test_meta_address_rejects_bad_keys() {
        let mut bytes = MetaAddress::new(key(0x02, 0xAA), key(0x03, 0xBB)).to_bytes();
        bytes[COMPRESSED_PUBLIC_KEY_SIZE] = 0x05;
        let input = format!("{META_ADDRESS_PREFIX}{}", hex::encode(bytes));
        assert!(matches!(
            input.parse::<MetaAddress>(),
            Err(StealthError::InvalidMetaAddress(_))
        ));

        let same = MetaAddress::new(key(0x02, 0x11), key(0x02, 0x11));
        assert!(matches!(
            same.validate(),
            Err(StealthError::InvalidMetaAddress(_))
        ));
    }

    #[test]
    fn test_meta_address_serde() {
        let meta = MetaAddress::new(key(0x02, 0x12), key(0x03, 0x34));
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("st:eth:0x"));
        let meta2: MetaAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, meta2);
    }

    #[test]
    fn test_address_eip55_checksum() {
        // Test vector from EIP-55.
        let addr = Address::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            addr.to_checksum_string(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_address_non_eth_length() {
        let addr = Address::from_bytes(&[0xAB; 32]).unwrap();
        assert_eq!(addr.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn test_address_bounds() {
        assert!(Address::from_bytes(&[]).is_err());
        assert!(Address::from_bytes(&[1u8; MAX_ADDRESS_SIZE + 1]).is_err());
        assert!(Address::from_bytes(&[1u8; MAX_ADDRESS_SIZE]).is_ok());
    }

    #[test]
    fn test_address_serde_roundtrip() {
        let addr = Address::from_eth([0x12; ETH_ADDRESS_SIZE]);
        let json = serde_json::to_string(&addr).unwrap();
        let addr2: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, addr2);
    }
}
