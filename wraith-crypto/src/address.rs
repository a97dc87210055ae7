//! Ledger address encoding.
//!
//! The protocol never interprets addresses; it only needs a deterministic,
//! pure function from a stealth public key to whatever the host ledger uses.
//! [`EthereumAddressEncoder`] is the default.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use subtle::ConstantTimeEq;

use wraith_core::constants::{ETH_ADDRESS_SIZE, KECCAK256_SIZE};
use wraith_core::types::Address;

use crate::hash::keccak256;

/// Maps a stealth public key to a ledger address.
///
/// Must be pure: the sender and the recipient each call it on the same point
/// and must agree. Any `Fn(&PublicKey) -> Address` closure is an encoder.
pub trait AddressEncoder: Send + Sync {
    /// Encodes the point.
    fn encode(&self, key: &PublicKey) -> Address;
}

impl<F> AddressEncoder for F
where
    F: Fn(&PublicKey) -> Address + Send + Sync,
{
    fn encode(&self, key: &PublicKey) -> Address {
        self(key)
    }
}

/// Ethereum address: last 20 bytes of Keccak-256 over the uncompressed point
/// without its `0x04` prefix.
#[derive(Clone, Copy, Debug, Default)]
pub struct EthereumAddressEncoder;

impl AddressEncoder for EthereumAddressEncoder {
    fn encode(&self, key: &PublicKey) -> Address {
        eth_address(key)
    }
}

/// Derives the Ethereum address of a public key.
pub fn eth_address(key: &PublicKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);

    let mut bytes = [0u8; ETH_ADDRESS_SIZE];
    bytes.copy_from_slice(&hash[KECCAK256_SIZE - ETH_ADDRESS_SIZE..]);
    Address::from_eth(bytes)
}

/// Compares two addresses in constant time (for equal lengths).
pub fn addresses_match(a: &Address, b: &Address) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
