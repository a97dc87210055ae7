//! Stealth key generation and validation (recipient side).
//!
//! A recipient owns two independent secp256k1 key pairs:
//!
//! ```text
//! spending: (k, K = k·G)   authority to move funds
//! viewing:  (v, V = v·G)   authority to recognise payments
//! ```
//!
//! The scalars are drawn separately, so no relation between `k` and `v`
//! exists for a viewing-key holder to exploit.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use wraith_core::constants::{DOMAIN_SPENDING_SEED, DOMAIN_VIEWING_SEED};
use wraith_core::error::{Result, StealthError};
use wraith_core::types::{
    CurvePublicKey, CurveSecretKey, EphemeralKeyPair, KeyPair, StealthKeyPair,
};
use wraith_crypto::{
    encode_public_key, keypair_from_scalar, parse_public_key, parse_secret_key, public_key_for,
    random_scalar, scalar_from_seed,
};

/// Generates a fresh recipient key set.
///
/// Draws the spending and viewing scalars independently from `rng`.
///
/// # Errors
/// `RandomnessUnavailable` if the entropy source fails. No weaker fallback
/// is ever tried.
pub fn generate_stealth_keys<R>(rng: &mut R) -> Result<StealthKeyPair>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let spending = generate_keypair(rng)?;
    let viewing = generate_keypair(rng)?;
    Ok(StealthKeyPair::new(spending, viewing))
}

/// Deterministically derives a recipient key set from a seed.
///
/// Each scalar comes from its own SHAKE256 domain, so the two remain
/// unrelated for anyone without the seed.
pub fn stealth_keys_from_seed(seed: &[u8]) -> Result<StealthKeyPair> {
    if seed.len() < 16 {
        return Err(StealthError::ValidationError(format!(
            "seed must be at least 16 bytes, got {}",
            seed.len()
        )));
    }

    let mut spending_sk = scalar_from_seed(DOMAIN_SPENDING_SEED, seed)?;
    let mut viewing_sk = scalar_from_seed(DOMAIN_VIEWING_SEED, seed)?;

    let spending = keypair_from_scalar(&spending_sk);
    let viewing = keypair_from_scalar(&viewing_sk);
    spending_sk.zeroize();
    viewing_sk.zeroize();

    Ok(StealthKeyPair::new(spending?, viewing?))
}

/// Generates a single random key pair.
pub fn generate_keypair<R>(rng: &mut R) -> Result<KeyPair>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut scalar = random_scalar(rng)?;
    let pair = keypair_from_scalar(&scalar);
    scalar.zeroize();
    pair
}

/// Generates the one-shot sender key pair for a single payment.
pub fn generate_ephemeral_keypair<R>(rng: &mut R) -> Result<EphemeralKeyPair>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let pair = generate_keypair(rng)?;
    Ok(EphemeralKeyPair::new(pair.public, pair.secret.clone()))
}

/// Checks that a key pair is well formed and `public == secret·G`.
pub fn validate_keypair(pair: &KeyPair) -> Result<()> {
    let mut scalar = parse_secret_key(&pair.secret)?;
    let declared = parse_public_key(&pair.public)?;
    let derived = public_key_for(&scalar);
    scalar.zeroize();

    if derived != declared {
        return Err(StealthError::InvalidPublicKey(
            "public key does not match private key".into(),
        ));
    }
    Ok(())
}

/// Checks both halves of a recipient key set.
///
/// Also rejects a set whose spending and viewing keys coincide.
pub fn validate_stealth_keys(keys: &StealthKeyPair) -> Result<()> {
    validate_keypair(&keys.spending)?;
    validate_keypair(&keys.viewing)?;
    keys.meta_address().validate()
}

/// Re-derives the compressed public key for a secret key.
pub fn public_key_of(secret: &CurveSecretKey) -> Result<CurvePublicKey> {
    let mut scalar = parse_secret_key(secret)?;
    let public = encode_public_key(&public_key_for(&scalar));
    scalar.zeroize();
    public
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use wraith_core::types::MetaAddress;

    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0)
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new("no entropy"))
        }
    }
    impl CryptoRng for FailingRng {}

    #[test]
    fn test_generate_stealth_keys() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let keys = generate_stealth_keys(&mut rng).unwrap();

        assert!(validate_stealth_keys(&keys).is_ok());
        assert_ne!(keys.spending_public_key(), keys.viewing_public_key());
        assert_ne!(
            keys.spending_private_key().as_bytes(),
            keys.viewing_private_key().as_bytes()
        );
    }

    #[test]
    fn test_generate_fails_closed_without_entropy() {
        assert!(matches!(
            generate_stealth_keys(&mut FailingRng),
            Err(StealthError::RandomnessUnavailable(_))
        ));
        assert!(matches!(
            generate_ephemeral_keypair(&mut FailingRng),
            Err(StealthError::RandomnessUnavailable(_))
        ));
    }

    #[test]
    fn test_keys_from_seed_deterministic() {
        let seed = [7u8; 32];
        let a = stealth_keys_from_seed(&seed).unwrap();
        let b = stealth_keys_from_seed(&seed).unwrap();

        assert_eq!(a.meta_address(), b.meta_address());
        assert!(validate_stealth_keys(&a).is_ok());

        let c = stealth_keys_from_seed(&[8u8; 32]).unwrap();
        assert_ne!(a.meta_address(), c.meta_address());
    }

    #[test]
    fn test_keys_from_short_seed_rejected() {
        assert!(matches!(
            stealth_keys_from_seed(&[1u8; 8]),
            Err(StealthError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_detects_mismatched_pair() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let a = generate_keypair(&mut rng).unwrap();
        let b = generate_keypair(&mut rng).unwrap();

        let mismatched = KeyPair::new(a.public, b.secret.clone());
        assert!(matches!(
            validate_keypair(&mismatched),
            Err(StealthError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_secret() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let a = generate_keypair(&mut rng).unwrap();
        let zero = KeyPair::new(a.public, CurveSecretKey::from_array([0u8; 32]));
        assert!(matches!(
            validate_keypair(&zero),
            Err(StealthError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_public_key_of_matches_generated() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let pair = generate_keypair(&mut rng).unwrap();
        assert_eq!(public_key_of(&pair.secret).unwrap(), pair.public);
    }

    #[test]
    fn test_meta_address_roundtrip_from_keys() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let keys = generate_stealth_keys(&mut rng).unwrap();
        let meta = keys.meta_address();
        let parsed: MetaAddress = meta.to_string().parse().unwrap();
        assert_eq!(parsed, meta);
    }
}
