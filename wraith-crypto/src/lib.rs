//! # WRAITH Cryptography
//!
//! secp256k1 primitives for the WRAITH protocol.
//!
//! This crate provides:
//!
//! - **Curve**: fail-closed parsing, scalar sampling, ECDH and hash-to-scalar
//! - **Hash**: Keccak-256 and domain-separated SHAKE256
//! - **View Tags**: Efficient computation for scanning optimization
//! - **Derivation**: Stealth key derivation functions
//! - **Addresses**: Pluggable ledger address encoding
//!
//! ## Security Properties
//!
//! - Scalar and point arithmetic is delegated to the constant-time `k256` crate
//! - Invalid points and out-of-range scalars are rejected, never reduced
//! - Shared secrets are zeroized on drop
//!
//! ## Example
//!
//! ```rust,ignore
//! use wraith_crypto::{random_scalar, public_key_for, shared_secret, compute_view_tag};
//!
//! let viewing_sk = random_scalar(&mut OsRng)?;
//! let ephemeral_sk = random_scalar(&mut OsRng)?;
//!
//! // Sender and recipient derive the same secret
//! let s1 = shared_secret(&ephemeral_sk, &public_key_for(&viewing_sk));
//! let s2 = shared_secret(&viewing_sk, &public_key_for(&ephemeral_sk));
//! assert_eq!(compute_view_tag(&s1), compute_view_tag(&s2));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod address;
pub mod curve;
pub mod derive;
pub mod hash;
pub mod view_tag;

// Re-export main functions at crate root
pub use address::{addresses_match, eth_address, AddressEncoder, EthereumAddressEncoder};
pub use curve::{
    encode_public_key, encode_secret_key, keypair_from_scalar, parse_public_key,
    parse_secret_key, public_key_for, public_key_from_sec1, random_scalar, scalar_from_seed,
    shared_secret, SharedSecret,
};
pub use derive::{derive_stealth_address, derive_stealth_private_key, verify_stealth_address};
pub use hash::{keccak256, shake256_xof};
pub use view_tag::{compute_view_tag, verify_view_tag, ViewTagHistogram};

pub use k256::{NonZeroScalar, PublicKey};
