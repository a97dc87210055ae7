//! Announcement types for the WRAITH announcement log.
//!
//! Announcements are published by senders and contain the ephemeral key
//! and view tag needed for recipients to discover payments.

use serde::{Deserialize, Serialize};

use super::{Address, CurvePublicKey};
use crate::constants::{
    COMPRESSED_PUBLIC_KEY_SIZE, MAX_ADDRESS_SIZE, MAX_PAYLOAD_SIZE, RECORD_FORMAT_VERSION,
    RECORD_HEADER_SIZE, SECP256K1_SCHEME_ID, VIEW_TAG_SPACE,
};
use crate::error::{Result, StealthError};

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// The public data a recipient needs to recognise a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StealthMetadata {
    /// Sender's one-shot public key
    pub ephemeral_public_key: CurvePublicKey,
    /// First byte of the shared-secret scalar
    pub view_tag: u8,
}

impl StealthMetadata {
    /// Creates stealth metadata.
    pub fn new(ephemeral_public_key: CurvePublicKey, view_tag: u8) -> Self {
        Self {
            ephemeral_public_key,
            view_tag,
        }
    }

    /// Encodes the ERC-5564 `metadata` field: view tag followed by the payload.
    pub fn to_erc5564_bytes(&self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(self.view_tag);
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Splits an ERC-5564 `metadata` field into view tag and payload.
    pub fn split_erc5564_bytes(bytes: &[u8]) -> Result<(u8, &[u8])> {
        match bytes.split_first() {
            Some((tag, payload)) => Ok((*tag, payload)),
            None => Err(StealthError::malformed(None, "empty ERC-5564 metadata")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCED STEALTH
// ═══════════════════════════════════════════════════════════════════════════════

/// An announcement appended to the log.
///
/// Immutable once appended; the log assigns `sequence_index`.
///
/// # Wire Format (binary)
/// ```text
/// version (1) || sequence_index (8, BE) || scheme_id (4, BE)
///   || ephemeral_key (33) || view_tag (1) || address_len (1) || payload_len (4, BE)
///   || address || payload
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncedStealth {
    /// Position in the log (assigned on append, 0-based)
    pub sequence_index: u64,
    /// ERC-5564 scheme id (1 = secp256k1 with view tags)
    #[serde(default = "default_scheme_id")]
    pub scheme_id: u32,
    /// The one-time address funds were sent to
    pub stealth_address: Address,
    /// Ephemeral key and view tag
    pub metadata: StealthMetadata,
    /// Opaque sender payload (e.g. token and amount)
    #[serde(with = "hex", default)]
    pub payload: Vec<u8>,
}

fn default_scheme_id() -> u32 {
    SECP256K1_SCHEME_ID
}

impl AnnouncedStealth {
    /// Creates an unsequenced secp256k1 announcement.
    pub fn new(stealth_address: Address, metadata: StealthMetadata, payload: Vec<u8>) -> Self {
        Self {
            sequence_index: 0, // Assigned by the log
            scheme_id: SECP256K1_SCHEME_ID,
            stealth_address,
            metadata,
            payload,
        }
    }

    /// Returns a copy with the given sequence index.
    pub fn with_sequence_index(mut self, sequence_index: u64) -> Self {
        self.sequence_index = sequence_index;
        self
    }

    /// Returns the announced view tag.
    pub fn view_tag(&self) -> u8 {
        self.metadata.view_tag
    }

    /// Returns the announced ephemeral public key.
    pub fn ephemeral_public_key(&self) -> &CurvePublicKey {
        &self.metadata.ephemeral_public_key
    }

    /// Validates the announcement structure.
    pub fn validate(&self) -> Result<()> {
        let index = Some(self.sequence_index);

        if self.scheme_id != SECP256K1_SCHEME_ID {
            return Err(StealthError::malformed(
                index,
                format!("unsupported scheme id {}", self.scheme_id),
            ));
        }

        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(StealthError::malformed(
                index,
                format!("payload of {} bytes exceeds {}", self.payload.len(), MAX_PAYLOAD_SIZE),
            ));
        }

        Ok(())
    }

    /// Serializes to the compact binary record format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let address = self.stealth_address.as_bytes();
        let mut bytes = Vec::with_capacity(RECORD_HEADER_SIZE + address.len() + self.payload.len());

        bytes.push(RECORD_FORMAT_VERSION);
        bytes.extend_from_slice(&self.sequence_index.to_be_bytes());
        bytes.extend_from_slice(&self.scheme_id.to_be_bytes());
        bytes.extend_from_slice(self.metadata.ephemeral_public_key.as_bytes());
        bytes.push(self.metadata.view_tag);
        // Address length is bounded by MAX_ADDRESS_SIZE at construction.
        bytes.push(address.len() as u8);
        bytes.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(address);
        bytes.extend_from_slice(&self.payload);

        bytes
    }

    /// Deserializes from the compact binary record format.
    ///
    /// # Errors
    /// `VersionMismatch` for an unknown record version, otherwise
    /// `MalformedAnnouncement` naming the sequence index once it is readable.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(StealthError::malformed(
                None,
                format!("too short: {} bytes, minimum {}", bytes.len(), RECORD_HEADER_SIZE),
            ));
        }

        let version = bytes[0];
        if version != RECORD_FORMAT_VERSION {
            return Err(StealthError::VersionMismatch {
                expected: RECORD_FORMAT_VERSION,
                actual: version,
            });
        }

        let mut cursor = 1;
        let sequence_index = u64::from_be_bytes(take_array(bytes, &mut cursor));
        let index = Some(sequence_index);
        let scheme_id = u32::from_be_bytes(take_array(bytes, &mut cursor));

        let ephemeral: [u8; COMPRESSED_PUBLIC_KEY_SIZE] = take_array(bytes, &mut cursor);
        let ephemeral_public_key = CurvePublicKey::from_array(ephemeral)
            .map_err(|e| StealthError::malformed(index, e.to_string()))?;

        let [view_tag] = take_array::<1>(bytes, &mut cursor);
        let [address_len] = take_array::<1>(bytes, &mut cursor);
        let payload_len = u32::from_be_bytes(take_array(bytes, &mut cursor)) as usize;

        let address_len = address_len as usize;
        if address_len == 0 || address_len > MAX_ADDRESS_SIZE {
            return Err(StealthError::malformed(
                index,
                format!("address length {address_len} out of range"),
            ));
        }
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(StealthError::malformed(
                index,
                format!("payload length {payload_len} exceeds {MAX_PAYLOAD_SIZE}"),
            ));
        }

        let expected = RECORD_HEADER_SIZE + address_len + payload_len;
        if bytes.len() != expected {
            return Err(StealthError::malformed(
                index,
                format!("length mismatch: expected {expected} bytes, got {}", bytes.len()),
            ));
        }

        let stealth_address = Address::from_bytes(&bytes[cursor..cursor + address_len])
            .map_err(|e| StealthError::malformed(index, e.to_string()))?;
        cursor += address_len;
        let payload = bytes[cursor..].to_vec();

        Ok(Self {
            sequence_index,
            scheme_id,
            stealth_address,
            metadata: StealthMetadata::new(ephemeral_public_key, view_tag),
            payload,
        })
    }
}

/// Reads a fixed-size field. Callers check the header length first.
fn take_array<const N: usize>(bytes: &[u8], cursor: &mut usize) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes[*cursor..*cursor + N]);
    *cursor += N;
    arr
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOG STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Statistics about announcements in a log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnouncementStats {
    /// Total number of announcements
    pub total_count: u64,
    /// Announcements per view tag (for distribution analysis)
    pub view_tag_distribution: Vec<u64>,
    /// Lowest sequence index seen
    pub first_sequence_index: Option<u64>,
    /// Highest sequence index seen
    pub last_sequence_index: Option<u64>,
    /// Sum of payload sizes in bytes
    pub payload_bytes: u64,
}

impl Default for AnnouncementStats {
    fn default() -> Self {
        Self {
            total_count: 0,
            view_tag_distribution: vec![0; VIEW_TAG_SPACE],
            first_sequence_index: None,
            last_sequence_index: None,
            payload_bytes: 0,
        }
    }
}

impl AnnouncementStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates stats with a new announcement.
    pub fn add(&mut self, announcement: &AnnouncedStealth) {
        self.total_count += 1;
        self.view_tag_distribution[announcement.view_tag() as usize] += 1;
        self.payload_bytes += announcement.payload.len() as u64;

        let index = announcement.sequence_index;
        self.first_sequence_index = Some(self.first_sequence_index.map_or(index, |f| f.min(index)));
        self.last_sequence_index = Some(self.last_sequence_index.map_or(index, |l| l.max(index)));
    }

    /// Number of distinct view tags seen.
    pub fn distinct_view_tags(&self) -> usize {
        self.view_tag_distribution.iter().filter(|&&c| c > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ETH_ADDRESS_SIZE;
    use proptest::prelude::*;

    fn make_ephemeral_key() -> CurvePublicKey {
        let mut bytes = [0x42u8; COMPRESSED_PUBLIC_KEY_SIZE];
        bytes[0] = 0x03;
        CurvePublicKey::from_array(bytes).unwrap()
    }

    fn make_announcement(view_tag: u8, payload: Vec<u8>) -> AnnouncedStealth {
        AnnouncedStealth::new(
            Address::from_eth([0x11; ETH_ADDRESS_SIZE]),
            StealthMetadata::new(make_ephemeral_key(), view_tag),
            payload,
        )
    }

    #[test]
    fn test_announcement_creation() {
        let ann = make_announcement(0x42, vec![]);
        assert_eq!(ann.view_tag(), 0x42);
        assert_eq!(ann.scheme_id, SECP256K1_SCHEME_ID);
        assert_eq!(ann.sequence_index, 0);
        assert!(ann.validate().is_ok());
    }

    #[test]
    fn test_announcement_bytes_roundtrip() {
        let ann = make_announcement(0xAB, b"token:0xdead;amount:42".to_vec()).with_sequence_index(7);
        let bytes = ann.to_bytes();
        assert_eq!(bytes.len(), RECORD_HEADER_SIZE + ETH_ADDRESS_SIZE + ann.payload.len());

        let ann2 = AnnouncedStealth::from_bytes(&bytes).unwrap();
        assert_eq!(ann, ann2);
    }

    #[test]
    fn test_announcement_rejects_truncated() {
        let bytes = make_announcement(1, vec![1, 2, 3]).to_bytes();

        let err = AnnouncedStealth::from_bytes(&bytes[..RECORD_HEADER_SIZE - 1]).unwrap_err();
        assert!(err.is_per_record());

        let err = AnnouncedStealth::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            StealthError::MalformedAnnouncement {
                sequence_index: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn test_announcement_rejects_unknown_version() {
        let mut bytes = make_announcement(1, vec![]).to_bytes();
        bytes[0] = RECORD_FORMAT_VERSION + 1;
        assert!(matches!(
            AnnouncedStealth::from_bytes(&bytes),
            Err(StealthError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_announcement_rejects_bad_point_prefix() {
        let mut bytes = make_announcement(1, vec![]).to_bytes();
        bytes[13] = 0x05; // first byte of the ephemeral key
        let err = AnnouncedStealth::from_bytes(&bytes).unwrap_err();
        assert!(err.is_per_record());
    }

    #[test]
    fn test_announcement_validation_scheme() {
        let mut ann = make_announcement(1, vec![]);
        ann.scheme_id = 2;
        assert!(ann.validate().unwrap_err().is_per_record());
    }

    #[test]
    fn test_erc5564_metadata() {
        let meta = StealthMetadata::new(make_ephemeral_key(), 0x9c);
        let bytes = meta.to_erc5564_bytes(&[1, 2]);
        assert_eq!(bytes, vec![0x9c, 1, 2]);

        let (tag, payload) = StealthMetadata::split_erc5564_bytes(&bytes).unwrap();
        assert_eq!(tag, 0x9c);
        assert_eq!(payload, &[1, 2]);
        assert!(StealthMetadata::split_erc5564_bytes(&[]).is_err());
    }

    #[test]
    fn test_announcement_json_default_scheme() {
        let ann = make_announcement(3, vec![0xff]);
        let mut value = serde_json::to_value(&ann).unwrap();
        value.as_object_mut().unwrap().remove("scheme_id");

        let parsed: AnnouncedStealth = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.scheme_id, SECP256K1_SCHEME_ID);
        assert_eq!(parsed.payload, vec![0xff]);
    }

    #[test]
    fn test_announcement_stats() {
        let mut stats = AnnouncementStats::new();

        stats.add(&make_announcement(0x42, vec![1, 2]).with_sequence_index(3));
        stats.add(&make_announcement(0x42, vec![]).with_sequence_index(1));
        stats.add(&make_announcement(0x00, vec![9]).with_sequence_index(2));

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.view_tag_distribution[0x42], 2);
        assert_eq!(stats.view_tag_distribution[0x00], 1);
        assert_eq!(stats.first_sequence_index, Some(1));
        assert_eq!(stats.last_sequence_index, Some(3));
        assert_eq!(stats.payload_bytes, 3);
        assert_eq!(stats.distinct_view_tags(), 2);
    }

    proptest! {
        #[test]
        fn test_decode_arbitrary_bytes_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..200)) {
            if let Ok(ann) = AnnouncedStealth::from_bytes(&bytes) {
                prop_assert_eq!(ann.to_bytes(), bytes);
            }
        }

        #[test]
        fn test_decode_truncated_record_is_per_record(
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            cut in 1usize..64,
        ) {
            let bytes = make_announcement(0x5a, payload).to_bytes();
            let cut = cut.min(bytes.len());
            let err = AnnouncedStealth::from_bytes(&bytes[..bytes.len() - cut]).unwrap_err();
            prop_assert!(err.is_per_record());
        }
    }
}
