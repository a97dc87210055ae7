//! Protocol constants for WRAITH.
//!
//! Curve sizes are those of secp256k1 (SEC 2). Scheme identifiers and the
//! meta-address prefix follow ERC-5564.

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a compressed SEC1 public key (`0x02`/`0x03` || x).
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;

/// Size of an uncompressed SEC1 public key (`0x04` || x || y).
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Size of a secp256k1 scalar (private key) in bytes, big-endian.
pub const SECRET_KEY_SIZE: usize = 32;

/// Maximum number of draws per scalar when sampling keys.
///
/// A uniformly random 256-bit string is rejected (≥ n or zero) with
/// probability below 2^-127, so exhausting this bound means the entropy
/// source is broken.
pub const MAX_SCALAR_SAMPLING_ATTEMPTS: u32 = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// ERC-5564
// ═══════════════════════════════════════════════════════════════════════════════

/// ERC-5564 scheme id for secp256k1 with view tags.
pub const SECP256K1_SCHEME_ID: u32 = 1;

/// Prefix of an Ethereum stealth meta-address URI.
pub const META_ADDRESS_PREFIX: &str = "st:eth:0x";

/// Size of the raw meta-address: spending key || viewing key (compressed).
pub const META_ADDRESS_SIZE: usize = 2 * COMPRESSED_PUBLIC_KEY_SIZE;

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW TAG CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of view tag in bytes.
/// One byte filters all but 1/256 of unrelated announcements.
pub const VIEW_TAG_SIZE: usize = 1;

/// Number of possible view tag values (2^8 = 256).
pub const VIEW_TAG_SPACE: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// HASH & ADDRESS SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of keccak256 hash output.
pub const KECCAK256_SIZE: usize = 32;

/// Size of Ethereum address in bytes (20 bytes = 160 bits).
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Largest ledger address accepted by [`crate::types::Address`].
pub const MAX_ADDRESS_SIZE: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════
// Used only for deterministic key derivation from a seed; the ERC-5564
// shared-secret hash carries no domain tag so it stays interoperable.

/// Domain separator for deriving the spending scalar from a seed.
pub const DOMAIN_SPENDING_SEED: &[u8] = b"WRAITH_SPENDING_SEED_V1";

/// Domain separator for deriving the viewing scalar from a seed.
pub const DOMAIN_VIEWING_SEED: &[u8] = b"WRAITH_VIEWING_SEED_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// RECORD FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Current binary record format version.
pub const RECORD_FORMAT_VERSION: u8 = 1;

/// Largest opaque payload carried by an announcement.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Fixed part of a binary record:
/// version (1) || sequence_index (8) || scheme_id (4) || ephemeral key (33)
/// || view_tag (1) || address_len (1) || payload_len (4).
pub const RECORD_HEADER_SIZE: usize = 1 + 8 + 4 + COMPRESSED_PUBLIC_KEY_SIZE + VIEW_TAG_SIZE + 1 + 4;

// ═══════════════════════════════════════════════════════════════════════════════
// PERFORMANCE TUNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default batch size for scanning announcements.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 1000;

/// Default number of records between progress callbacks.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Default capacity of a push→pull announcement feed.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_sizes() {
        assert_eq!(COMPRESSED_PUBLIC_KEY_SIZE, 33);
        assert_eq!(UNCOMPRESSED_PUBLIC_KEY_SIZE, 65);
        assert_eq!(SECRET_KEY_SIZE, 32);
    }

    #[test]
    fn test_view_tag_space_matches_size() {
        assert_eq!(VIEW_TAG_SPACE, 1 << (8 * VIEW_TAG_SIZE));
    }

    #[test]
    fn test_meta_address_size() {
        assert_eq!(META_ADDRESS_SIZE, 66);
    }

    #[test]
    fn test_record_header_size() {
        assert_eq!(RECORD_HEADER_SIZE, 52);
    }

    #[test]
    fn test_domain_separators_unique() {
        assert_ne!(DOMAIN_SPENDING_SEED, DOMAIN_VIEWING_SEED);
    }
}
