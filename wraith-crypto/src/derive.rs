//! Stealth key and address derivation.
//!
//! ## Derivation Flow
//!
//! ```text
//! s = hash_to_scalar(r · V)        sender: ephemeral r, viewing key V
//!   = hash_to_scalar(v · R)        recipient: viewing v, ephemeral R
//!       ↓
//! P_stealth = P_spend + s·G
//!       ↓
//! address = encoder(P_stealth)
//! ```
//!
//! ## Private Key Derivation
//!
//! Only the holder of the spending scalar can compute
//!
//! ```text
//! stealth_sk = spend_sk + s  (mod n)
//! ```
//!
//! and `stealth_sk · G == P_stealth` by linearity.

use k256::{NonZeroScalar, PublicKey};

use wraith_core::error::{Result, StealthError};
use wraith_core::types::Address;

use crate::address::{addresses_match, AddressEncoder};
use crate::curve::{mul_generator, SharedSecret};

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PUBLIC KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth public key `P_spend + s·G`.
///
/// # Errors
/// `StealthDerivationError` if the sum is the identity, which requires
/// `s ≡ −spend_sk` and never happens outside an attack on Keccak.
pub fn derive_stealth_public_key(spending_pk: &PublicKey, secret: &SharedSecret) -> Result<PublicKey> {
    let point = spending_pk.to_projective() + mul_generator(secret.scalar());
    PublicKey::from_affine(point.to_affine())
        .map_err(|_| StealthError::StealthDerivationError("stealth point is the identity".into()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PRIVATE KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth private key `spend_sk + s mod n`.
///
/// # Security
///
/// This function handles sensitive key material. Store the result as a
/// [`wraith_core::types::CurveSecretKey`], which is zeroized on drop.
pub fn derive_stealth_private_key(
    spending_sk: &NonZeroScalar,
    secret: &SharedSecret,
) -> Result<NonZeroScalar> {
    let sum = **spending_sk + secret.scalar();
    Option::<NonZeroScalar>::from(NonZeroScalar::new(sum))
        .ok_or_else(|| StealthError::StealthDerivationError("stealth scalar is zero".into()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth public key and its address.
///
/// This is the function used by senders to compute where to send funds.
pub fn derive_stealth_address<E>(
    spending_pk: &PublicKey,
    secret: &SharedSecret,
    encoder: &E,
) -> Result<(PublicKey, Address)>
where
    E: AddressEncoder + ?Sized,
{
    let stealth_pk = derive_stealth_public_key(spending_pk, secret)?;
    let address = encoder.encode(&stealth_pk);
    Ok((stealth_pk, address))
}

// ═══════════════════════════════════════════════════════════════════════════════
// VERIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies that a stealth address was derived for this spending key.
///
/// Used to confirm a view-tag match is actually for this recipient.
pub fn verify_stealth_address<E>(
    spending_pk: &PublicKey,
    secret: &SharedSecret,
    encoder: &E,
    expected_address: &Address,
) -> Result<bool>
where
    E: AddressEncoder + ?Sized,
{
    let (_, derived) = derive_stealth_address(spending_pk, secret, encoder)?;
    Ok(addresses_match(&derived, expected_address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::EthereumAddressEncoder;
    use crate::curve::{public_key_for, random_scalar, shared_secret};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use wraith_core::constants::ETH_ADDRESS_SIZE;

    struct Fixture {
        spending_sk: NonZeroScalar,
        spending_pk: PublicKey,
        viewing_sk: NonZeroScalar,
        viewing_pk: PublicKey,
        ephemeral_sk: NonZeroScalar,
        ephemeral_pk: PublicKey,
    }

    fn fixture(seed: u64) -> Fixture {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let spending_sk = random_scalar(&mut rng).unwrap();
        let viewing_sk = random_scalar(&mut rng).unwrap();
        let ephemeral_sk = random_scalar(&mut rng).unwrap();
        Fixture {
            spending_pk: public_key_for(&spending_sk),
            viewing_pk: public_key_for(&viewing_sk),
            ephemeral_pk: public_key_for(&ephemeral_sk),
            spending_sk,
            viewing_sk,
            ephemeral_sk,
        }
    }

    #[test]
    fn test_sender_and_recipient_agree() {
        let f = fixture(1);
        let sender = shared_secret(&f.ephemeral_sk, &f.viewing_pk);
        let recipient = shared_secret(&f.viewing_sk, &f.ephemeral_pk);

        let (pk_s, addr_s) =
            derive_stealth_address(&f.spending_pk, &sender, &EthereumAddressEncoder).unwrap();
        let (pk_r, addr_r) =
            derive_stealth_address(&f.spending_pk, &recipient, &EthereumAddressEncoder).unwrap();

        assert_eq!(pk_s, pk_r);
        assert_eq!(addr_s, addr_r);
        assert_eq!(addr_s.len(), ETH_ADDRESS_SIZE);
    }

    #[test]
    fn test_private_key_controls_stealth_point() {
        let f = fixture(2);
        let secret = shared_secret(&f.viewing_sk, &f.ephemeral_pk);

        let stealth_pk = derive_stealth_public_key(&f.spending_pk, &secret).unwrap();
        let stealth_sk = derive_stealth_private_key(&f.spending_sk, &secret).unwrap();

        assert_eq!(public_key_for(&stealth_sk), stealth_pk);
    }

    #[test]
    fn test_stealth_key_differs_from_spending_key() {
        let f = fixture(3);
        let secret = shared_secret(&f.ephemeral_sk, &f.viewing_pk);
        let stealth_pk = derive_stealth_public_key(&f.spending_pk, &secret).unwrap();
        assert_ne!(stealth_pk, f.spending_pk);
    }

    #[test]
    fn test_verify_stealth_address() {
        let f = fixture(4);
        let secret = shared_secret(&f.ephemeral_sk, &f.viewing_pk);
        let (_, address) =
            derive_stealth_address(&f.spending_pk, &secret, &EthereumAddressEncoder).unwrap();

        assert!(
            verify_stealth_address(&f.spending_pk, &secret, &EthereumAddressEncoder, &address)
                .unwrap()
        );

        // Wrong address should fail
        let wrong_address = Address::from_eth([0xFF; ETH_ADDRESS_SIZE]);
        assert!(!verify_stealth_address(
            &f.spending_pk,
            &secret,
            &EthereumAddressEncoder,
            &wrong_address
        )
        .unwrap());
    }

    #[test]
    fn test_wrong_viewing_key_derives_other_address() {
        let f = fixture(5);
        let other = fixture(6);

        let sender = shared_secret(&f.ephemeral_sk, &f.viewing_pk);
        let outsider = shared_secret(&other.viewing_sk, &f.ephemeral_pk);

        let (_, expected) =
            derive_stealth_address(&f.spending_pk, &sender, &EthereumAddressEncoder).unwrap();
        assert!(!verify_stealth_address(
            &f.spending_pk,
            &outsider,
            &EthereumAddressEncoder,
            &expected
        )
        .unwrap());
    }
}
