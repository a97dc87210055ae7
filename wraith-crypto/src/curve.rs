//! Fail-closed wrapper over the secp256k1 implementation in `k256`.
//!
//! Every byte string coming from outside passes through this module before
//! any curve arithmetic:
//!
//! - public keys must decode to a non-identity point on the curve
//! - secret keys must be scalars in [1, n−1]
//!
//! Anything else is rejected, never clamped or reduced.
//!
//! ## Shared secret
//!
//! ```text
//! S = k · P                          (ECDH, full point)
//! s = keccak256(compress(S)) mod n   (hash-to-scalar)
//! ```

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, FieldBytes, NonZeroScalar, ProjectivePoint, PublicKey, Scalar, U256};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use wraith_core::constants::{
    COMPRESSED_PUBLIC_KEY_SIZE, MAX_SCALAR_SAMPLING_ATTEMPTS, SECRET_KEY_SIZE,
    UNCOMPRESSED_PUBLIC_KEY_SIZE,
};
use wraith_core::error::{Result, StealthError};
use wraith_core::types::{CurvePublicKey, CurveSecretKey, KeyPair};

use crate::hash::{keccak256, shake256_xof};

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Decodes a compressed public key into a curve point.
///
/// # Errors
/// `InvalidPublicKey` if the bytes are not a point on secp256k1. The identity
/// has no SEC1 compressed form, so it can never get through.
pub fn parse_public_key(key: &CurvePublicKey) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(key.as_bytes())
        .map_err(|_| StealthError::InvalidPublicKey("not a point on secp256k1".into()))
}

/// Validates a SEC1 public key (33-byte compressed or 65-byte uncompressed)
/// and returns it in compressed form.
pub fn public_key_from_sec1(bytes: &[u8]) -> Result<CurvePublicKey> {
    if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
        return Err(StealthError::InvalidPublicKey(format!(
            "expected {} or {} bytes, got {}",
            COMPRESSED_PUBLIC_KEY_SIZE,
            UNCOMPRESSED_PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }

    let point = PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| StealthError::InvalidPublicKey("not a point on secp256k1".into()))?;
    encode_public_key(&point)
}

/// Decodes a secret key into a non-zero scalar.
///
/// # Errors
/// `InvalidPrivateKey` if the value is zero or not below the group order.
pub fn parse_secret_key(key: &CurveSecretKey) -> Result<NonZeroScalar> {
    let bytes = FieldBytes::clone_from_slice(key.as_bytes());
    Option::<NonZeroScalar>::from(NonZeroScalar::from_repr(bytes))
        .ok_or_else(|| StealthError::InvalidPrivateKey("scalar is zero or not below n".into()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Compresses a curve point.
pub fn encode_public_key(key: &PublicKey) -> Result<CurvePublicKey> {
    CurvePublicKey::from_bytes(key.to_encoded_point(true).as_bytes())
}

/// Serializes a scalar as 32 big-endian bytes.
pub fn encode_secret_key(scalar: &NonZeroScalar) -> CurveSecretKey {
    let mut bytes: [u8; SECRET_KEY_SIZE] = scalar.to_bytes().into();
    let key = CurveSecretKey::from_array(bytes);
    bytes.zeroize();
    key
}

/// Returns `scalar · G`.
pub fn public_key_for(scalar: &NonZeroScalar) -> PublicKey {
    PublicKey::from_secret_scalar(scalar)
}

/// Builds a validated key pair from a scalar.
pub fn keypair_from_scalar(scalar: &NonZeroScalar) -> Result<KeyPair> {
    let public = encode_public_key(&public_key_for(scalar))?;
    Ok(KeyPair::new(public, encode_secret_key(scalar)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCALAR SAMPLING
// ═══════════════════════════════════════════════════════════════════════════════

/// Draws a uniform scalar in [1, n−1] by reject-and-resample.
///
/// # Errors
/// `RandomnessUnavailable` if the source reports a failure or produces no
/// valid scalar within [`MAX_SCALAR_SAMPLING_ATTEMPTS`] draws.
pub fn random_scalar<R>(rng: &mut R) -> Result<NonZeroScalar>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut buf = [0u8; SECRET_KEY_SIZE];

    for _ in 0..MAX_SCALAR_SAMPLING_ATTEMPTS {
        if let Err(e) = rng.try_fill_bytes(&mut buf) {
            buf.zeroize();
            return Err(StealthError::RandomnessUnavailable(e.to_string()));
        }

        let candidate = NonZeroScalar::from_repr(FieldBytes::from(buf));
        if let Some(scalar) = Option::<NonZeroScalar>::from(candidate) {
            buf.zeroize();
            return Ok(scalar);
        }
    }

    buf.zeroize();
    Err(StealthError::RandomnessUnavailable(format!(
        "no valid scalar in {MAX_SCALAR_SAMPLING_ATTEMPTS} draws"
    )))
}

/// Deterministically derives a scalar from a seed.
///
/// Reads successive 32-byte blocks of `SHAKE256(domain || seed)` until one
/// is a valid scalar.
pub fn scalar_from_seed(domain: &[u8], seed: &[u8]) -> Result<NonZeroScalar> {
    let mut reader = shake256_xof(domain, seed);

    for _ in 0..MAX_SCALAR_SAMPLING_ATTEMPTS {
        let mut block: [u8; SECRET_KEY_SIZE] = reader.read_array();
        let candidate = NonZeroScalar::from_repr(FieldBytes::from(block));
        block.zeroize();
        if let Some(scalar) = Option::<NonZeroScalar>::from(candidate) {
            return Ok(scalar);
        }
    }

    Err(StealthError::StealthDerivationError(
        "seed expansion produced no valid scalar".into(),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED SECRET
// ═══════════════════════════════════════════════════════════════════════════════

/// Hashed ECDH shared secret `s`, reduced into the scalar field.
///
/// Zeroized on drop.
pub struct SharedSecret {
    scalar: Scalar,
}

impl SharedSecret {
    /// Returns the shared scalar.
    pub fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// Returns the view tag: the first big-endian byte of the scalar.
    pub fn view_tag(&self) -> u8 {
        self.scalar.to_bytes()[0]
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// Computes the raw ECDH point `secret · public`.
///
/// Never the identity: the scalar is non-zero and secp256k1 has prime order.
pub fn ecdh_point(secret: &NonZeroScalar, public: &PublicKey) -> AffinePoint {
    (public.to_projective() * **secret).to_affine()
}

/// Maps a curve point to a scalar: Keccak-256 of its compressed encoding, mod n.
pub fn hash_to_scalar(point: &AffinePoint) -> Scalar {
    let digest = keccak256(point.to_encoded_point(true).as_bytes());
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(digest))
}

/// Derives the hashed shared secret for a private/public key pair.
///
/// Symmetric: `shared_secret(a, B) == shared_secret(b, A)`.
pub fn shared_secret(secret: &NonZeroScalar, public: &PublicKey) -> SharedSecret {
    SharedSecret {
        scalar: hash_to_scalar(&ecdh_point(secret, public)),
    }
}

/// Returns `scalar · G` as a projective point.
pub(crate) fn mul_generator(scalar: &Scalar) -> ProjectivePoint {
    ProjectivePoint::GENERATOR * scalar
}
