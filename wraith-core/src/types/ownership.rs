//! Scan results: stealth addresses recognised as belonging to the recipient.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{Address, AnnouncedStealth, CurveSecretKey};

/// A stealth address the recipient owns, with the key that spends from it.
///
/// Exists only in scanner output. The private key is zeroized on drop and
/// never shown by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OwnedStealthAddress {
    #[zeroize(skip)]
    stealth_address: Address,
    stealth_private_key: CurveSecretKey,
    #[zeroize(skip)]
    source: AnnouncedStealth,
}

impl OwnedStealthAddress {
    /// Creates an owned stealth address.
    pub fn new(
        stealth_address: Address,
        stealth_private_key: CurveSecretKey,
        source: AnnouncedStealth,
    ) -> Self {
        Self {
            stealth_address,
            stealth_private_key,
            source,
        }
    }

    /// Returns the one-time address.
    pub fn stealth_address(&self) -> &Address {
        &self.stealth_address
    }

    /// Returns the private key controlling the address.
    ///
    /// # Security
    /// Handle with care - this key spends the funds.
    pub fn stealth_private_key(&self) -> &CurveSecretKey {
        &self.stealth_private_key
    }

    /// Returns the announcement that revealed this address.
    pub fn source_announcement(&self) -> &AnnouncedStealth {
        &self.source
    }

    /// Returns the log position of the source announcement.
    pub fn sequence_index(&self) -> u64 {
        self.source.sequence_index
    }
}

impl std::fmt::Debug for OwnedStealthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedStealthAddress")
            .field("stealth_address", &self.stealth_address)
            .field("stealth_private_key", &"[REDACTED]")
            .field("sequence_index", &self.source.sequence_index)
            .finish()
    }
}

/// A stealth address recognised with the viewing key alone.
///
/// Carries no spending authority, so it is safe to hand to auditors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedStealthAddress {
    /// The one-time address
    pub stealth_address: Address,
    /// The announcement that revealed it
    pub source: AnnouncedStealth,
}

impl DetectedStealthAddress {
    /// Creates a detected stealth address.
    pub fn new(stealth_address: Address, source: AnnouncedStealth) -> Self {
        Self {
            stealth_address,
            source,
        }
    }

    /// Returns the log position of the source announcement.
    pub fn sequence_index(&self) -> u64 {
        self.source.sequence_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COMPRESSED_PUBLIC_KEY_SIZE, ETH_ADDRESS_SIZE, SECRET_KEY_SIZE};
    use crate::types::{CurvePublicKey, StealthMetadata};

    fn announcement() -> AnnouncedStealth {
        let mut eph = [0x55u8; COMPRESSED_PUBLIC_KEY_SIZE];
        eph[0] = 0x02;
        AnnouncedStealth::new(
            Address::from_eth([0x22; ETH_ADDRESS_SIZE]),
            StealthMetadata::new(CurvePublicKey::from_array(eph).unwrap(), 0x10),
            vec![],
        )
        .with_sequence_index(9)
    }

    #[test]
    fn test_owned_debug_redacted() {
        let ann = announcement();
        let owned = OwnedStealthAddress::new(
            ann.stealth_address.clone(),
            CurveSecretKey::from_array([0xEE; SECRET_KEY_SIZE]),
            ann,
        );

        let debug = format!("{:?}", owned);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("eeee"));
        assert_eq!(owned.sequence_index(), 9);
    }

    #[test]
    fn test_detected_serde() {
        let ann = announcement();
        let detected = DetectedStealthAddress::new(ann.stealth_address.clone(), ann);
        let json = serde_json::to_string(&detected).unwrap();
        let back: DetectedStealthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, detected);
    }
}
