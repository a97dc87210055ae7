//! Key types for WRAITH.
//!
//! This module defines the key structures used in the protocol:
//!
//! - [`CurvePublicKey`]: Compressed secp256k1 point (33 bytes)
//! - [`CurveSecretKey`]: secp256k1 scalar (32 bytes, zeroized on drop)
//! - [`KeyPair`]: Combined public + secret key
//! - [`StealthKeyPair`]: Spending + viewing key pairs of one recipient
//! - [`EphemeralKeyPair`]: One-shot sender key for a single payment
//! - [`ViewingKey`]: Delegated scanning capability (no spending authority)
//!
//! These are byte carriers. Curve membership and scalar range are checked by
//! `wraith-crypto` before any arithmetic.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{COMPRESSED_PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
use crate::error::{Result, StealthError};
use crate::types::MetaAddress;

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Compressed SEC1 encoding of a secp256k1 point.
///
/// Safe to share publicly. Only the encoding prefix is checked here; use
/// `wraith_crypto::parse_public_key` to prove the point is on the curve.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurvePublicKey {
    bytes: [u8; COMPRESSED_PUBLIC_KEY_SIZE],
}

impl CurvePublicKey {
    /// Creates a public key from compressed SEC1 bytes.
    ///
    /// # Errors
    /// Returns `InvalidPublicKey` if the length is not 33 or the prefix is not
    /// `0x02`/`0x03`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE {
            return Err(StealthError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                COMPRESSED_PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Self::from_array(arr)
    }

    /// Creates a public key from a fixed-size array.
    pub fn from_array(bytes: [u8; COMPRESSED_PUBLIC_KEY_SIZE]) -> Result<Self> {
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(StealthError::InvalidPublicKey(format!(
                "unknown compressed point prefix 0x{:02x}",
                bytes[0]
            )));
        }
        Ok(Self { bytes })
    }

    /// Returns the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the public key as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_SIZE] {
        &self.bytes
    }

    /// Returns the hex-encoded public key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Creates a public key from hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for CurvePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CurvePublicKey({}...{})",
            hex::encode(&self.bytes[..5]),
            hex::encode(&self.bytes[COMPRESSED_PUBLIC_KEY_SIZE - 4..])
        )
    }
}

impl std::fmt::Display for CurvePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

// Serde implementation that uses hex encoding
impl Serialize for CurvePublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CurvePublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECRET KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Big-endian secp256k1 scalar.
///
/// This key is sensitive and will be automatically zeroized when dropped.
/// Never expose this key in logs or error messages.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CurveSecretKey {
    bytes: [u8; SECRET_KEY_SIZE],
}

impl CurveSecretKey {
    /// Creates a secret key from raw bytes.
    ///
    /// # Errors
    /// Returns `InvalidPrivateKey` if the length is not 32. The range
    /// [1, n−1] is enforced by `wraith_crypto::parse_secret_key`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(StealthError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; SECRET_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a secret key from a fixed-size array.
    pub fn from_array(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a secret key from hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(s)?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Returns the raw bytes of the secret key.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the secret key as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for CurveSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose secret key content
        write!(f, "CurveSecretKey([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 key pair (public + secret).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Public key (safe to share)
    #[zeroize(skip)]
    pub public: CurvePublicKey,
    /// Secret key (keep private, auto-zeroized)
    pub secret: CurveSecretKey,
}

impl KeyPair {
    /// Creates a new key pair from public and secret keys.
    pub fn new(public: CurvePublicKey, secret: CurveSecretKey) -> Self {
        Self { public, secret }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Spending key pair - its secret half is needed to spend from stealth addresses.
pub type SpendingKeyPair = KeyPair;

/// Viewing key pair - its secret half is enough to detect incoming payments.
pub type ViewingKeyPair = KeyPair;

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// The long-lived dual key set of one recipient.
///
/// The spending and viewing scalars are drawn independently, so handing out
/// the viewing half delegates scanning without delegating spending.
#[derive(ZeroizeOnDrop)]
pub struct StealthKeyPair {
    /// Keys for spending from stealth addresses
    pub spending: SpendingKeyPair,
    /// Keys for viewing/scanning announcements
    pub viewing: ViewingKeyPair,
}

impl StealthKeyPair {
    /// Creates a new key set.
    pub fn new(spending: SpendingKeyPair, viewing: ViewingKeyPair) -> Self {
        Self { spending, viewing }
    }

    /// Returns the spending public key.
    pub fn spending_public_key(&self) -> &CurvePublicKey {
        &self.spending.public
    }

    /// Returns the spending private key.
    pub fn spending_private_key(&self) -> &CurveSecretKey {
        &self.spending.secret
    }

    /// Returns the viewing public key.
    pub fn viewing_public_key(&self) -> &CurvePublicKey {
        &self.viewing.public
    }

    /// Returns the viewing private key.
    pub fn viewing_private_key(&self) -> &CurveSecretKey {
        &self.viewing.secret
    }

    /// Returns the publishable stealth meta-address.
    pub fn meta_address(&self) -> MetaAddress {
        MetaAddress::new(self.spending.public, self.viewing.public)
    }

    /// Returns the view-only capability for delegated scanning.
    pub fn viewing_key(&self) -> ViewingKey {
        ViewingKey::new(self.viewing.secret.clone(), self.spending.public)
    }
}

impl std::fmt::Debug for StealthKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthKeyPair")
            .field("spending", &self.spending)
            .field("viewing", &self.viewing)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EPHEMERAL KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// Sender-side key pair used for exactly one payment.
///
/// Only the public half leaves the derivation; the secret half is zeroized
/// when the pair is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    #[zeroize(skip)]
    public: CurvePublicKey,
    secret: CurveSecretKey,
}

impl EphemeralKeyPair {
    /// Creates an ephemeral key pair.
    pub fn new(public: CurvePublicKey, secret: CurveSecretKey) -> Self {
        Self { public, secret }
    }

    /// Returns the ephemeral public key (published in the announcement).
    pub fn public_key(&self) -> &CurvePublicKey {
        &self.public
    }

    /// Returns the ephemeral private key.
    pub fn private_key(&self) -> &CurveSecretKey {
        &self.secret
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEWING KEY (DELEGATION)
// ═══════════════════════════════════════════════════════════════════════════════

/// View-only capability: detects payments but cannot spend them.
///
/// Can be shared with an auditor or a scanning service.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ViewingKey {
    viewing_secret: CurveSecretKey,
    #[zeroize(skip)]
    spending_public: CurvePublicKey,
}

impl ViewingKey {
    /// Creates a viewing key from the viewing secret and spending public key.
    pub fn new(viewing_secret: CurveSecretKey, spending_public: CurvePublicKey) -> Self {
        Self {
            viewing_secret,
            spending_public,
        }
    }

    /// Returns the viewing private key.
    pub fn viewing_private_key(&self) -> &CurveSecretKey {
        &self.viewing_secret
    }

    /// Returns the spending public key.
    pub fn spending_public_key(&self) -> &CurvePublicKey {
        &self.spending_public
    }
}

impl std::fmt::Debug for ViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewingKey")
            .field("viewing_secret", &"[REDACTED]")
            .field("spending_public", &self.spending_public)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample_point() -> [u8; COMPRESSED_PUBLIC_KEY_SIZE] {
        let mut bytes = [0x42u8; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = 0x02;
        bytes
    }

    #[test]
    fn test_public_key_from_bytes() {
        let bytes = sample_point();
        let pk = CurvePublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(pk.as_bytes(), &bytes);
    }

    #[test]
    fn test_public_key_wrong_size() {
        let result = CurvePublicKey::from_bytes(&[0x02; 32]);
        assert!(matches!(result, Err(StealthError::InvalidPublicKey(_))));
    }

    #[test_case(0x02 => true ; "even y")]
    #[test_case(0x03 => true ; "odd y")]
    #[test_case(0x00 => false ; "identity encoding")]
    #[test_case(0x04 => false ; "uncompressed prefix")]
    #[test_case(0x06 => false ; "hybrid prefix")]
    #[test_case(0xff => false ; "garbage prefix")]
    fn test_public_key_prefix(prefix: u8) -> bool {
        let mut bytes = sample_point();
        bytes[0] = prefix;
        match CurvePublicKey::from_array(bytes) {
            Ok(_) => true,
            Err(e) => {
                assert!(matches!(e, StealthError::InvalidPublicKey(_)));
                false
            }
        }
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = CurvePublicKey::from_array(sample_point()).unwrap();
        let pk2 = CurvePublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, pk2);

        let prefixed = CurvePublicKey::from_hex(&pk.to_string()).unwrap();
        assert_eq!(pk, prefixed);
    }

    #[test]
    fn test_public_key_serde() {
        let pk = CurvePublicKey::from_array(sample_point()).unwrap();
        let json = serde_json::to_string(&pk).unwrap();
        let pk2: CurvePublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn test_secret_key_wrong_size() {
        let result = CurveSecretKey::from_bytes(&[1u8; 31]);
        assert!(matches!(result, Err(StealthError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_secret_key_debug_redacted() {
        let sk = CurveSecretKey::from_array([0xAB; SECRET_KEY_SIZE]);
        let debug = format!("{:?}", sk);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }

    #[test]
    fn test_viewing_key_debug_redacted() {
        let vk = ViewingKey::new(
            CurveSecretKey::from_array([0xCD; SECRET_KEY_SIZE]),
            CurvePublicKey::from_array(sample_point()).unwrap(),
        );
        let debug = format!("{:?}", vk);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("cdcd"));
    }
}
