//! Hashing utilities.
//!
//! - **Keccak-256**: shared-secret hashing and Ethereum addresses
//!   (interoperable with ERC-5564 tooling, so no domain tag)
//! - **SHAKE256**: seed expansion with domain separation
//!
//! ## Domain Separation
//!
//! Each SHAKE256 use carries a unique, length-prefixed domain separator:
//!
//! ```text
//! output = SHAKE256(len(domain) || domain || input)
//! ```

use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

// ═══════════════════════════════════════════════════════════════════════════════
// SHAKE256
// ═══════════════════════════════════════════════════════════════════════════════

/// Returns a SHAKE256 XOF reader for streaming output.
///
/// Use this when the number of output blocks is not known up front, as in
/// reject-and-resample seed expansion.
pub fn shake256_xof(domain: &[u8], input: &[u8]) -> Shake256XofReader {
    let mut hasher = Shake256::default();

    // Domain separation: prepend domain with length prefix
    hasher.update(&(domain.len() as u32).to_le_bytes());
    hasher.update(domain);
    hasher.update(input);

    Shake256XofReader {
        reader: hasher.finalize_xof(),
    }
}

/// Streaming reader for SHAKE256 output.
pub struct Shake256XofReader {
    reader: sha3::digest::core_api::XofReaderCoreWrapper<sha3::Shake256ReaderCore>,
}

impl Shake256XofReader {
    /// Reads bytes into the provided buffer.
    pub fn read(&mut self, output: &mut [u8]) {
        self.reader.read(output);
    }

    /// Reads and returns a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut output = [0u8; N];
        self.reader.read(&mut output);
        output
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KECCAK256
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes Keccak256 hash.
///
/// Note: Keccak256 is NOT SHA3-256. They use different padding.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    use sha3::{Digest, Keccak256};

    let mut hasher = Keccak256::new();
    Digest::update(&mut hasher, input);
    hasher.finalize().into()
}
