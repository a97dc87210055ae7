//! Stealth address generation (sender side).

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use wraith_core::error::{Result, StealthError};
use wraith_core::types::{
    Address, AnnouncedStealth, CurvePublicKey, CurveSecretKey, EphemeralKeyPair,
    GeneratedStealthAddress, MetaAddress,
};
use wraith_crypto::derive::derive_stealth_address;
use wraith_crypto::{
    compute_view_tag, encode_public_key, parse_public_key, parse_secret_key, shared_secret,
    AddressEncoder, EthereumAddressEncoder,
};

use crate::keys::generate_ephemeral_keypair;

/// Generates a one-time stealth address for a recipient.
///
/// 1. draws a fresh ephemeral key pair `(r, R)`
/// 2. `s = hash_to_scalar(r · V)`
/// 3. `P_stealth = K + s·G`
/// 4. `address = encoder(P_stealth)`, `view_tag = first byte of s`
///
/// The ephemeral private key is zeroized before this returns.
///
/// # Errors
/// `InvalidPublicKey` if either recipient key is off-curve,
/// `RandomnessUnavailable` if the entropy source fails.
pub fn generate_stealth_address<E, R>(
    spending_pk: &CurvePublicKey,
    viewing_pk: &CurvePublicKey,
    encoder: &E,
    rng: &mut R,
) -> Result<GeneratedStealthAddress>
where
    E: AddressEncoder + ?Sized,
    R: RngCore + CryptoRng + ?Sized,
{
    // Validate the recipient before consuming entropy.
    parse_public_key(spending_pk)?;
    parse_public_key(viewing_pk)?;

    let ephemeral = generate_ephemeral_keypair(rng)?;
    derive_with_ephemeral(spending_pk, viewing_pk, &ephemeral, encoder)
}

/// Generates a stealth address for a published meta-address.
pub fn generate_for_meta_address<E, R>(
    meta_address: &MetaAddress,
    encoder: &E,
    rng: &mut R,
) -> Result<GeneratedStealthAddress>
where
    E: AddressEncoder + ?Sized,
    R: RngCore + CryptoRng + ?Sized,
{
    meta_address.validate()?;
    generate_stealth_address(&meta_address.spending_pk, &meta_address.viewing_pk, encoder, rng)
}

/// Derives the stealth address for a caller-chosen ephemeral key.
///
/// Deterministic; used for test vectors and by wallets that manage their
/// own ephemeral keys. Reusing an ephemeral key links payments.
pub fn derive_with_ephemeral<E>(
    spending_pk: &CurvePublicKey,
    viewing_pk: &CurvePublicKey,
    ephemeral: &EphemeralKeyPair,
    encoder: &E,
) -> Result<GeneratedStealthAddress>
where
    E: AddressEncoder + ?Sized,
{
    let spending = parse_public_key(spending_pk)?;
    let viewing = parse_public_key(viewing_pk)?;
    let mut r = parse_secret_key(ephemeral.private_key())?;

    let secret = shared_secret(&r, &viewing);
    r.zeroize();

    let view_tag = compute_view_tag(&secret);
    let (stealth_pk, stealth_address) = derive_stealth_address(&spending, &secret, encoder)?;

    Ok(GeneratedStealthAddress {
        stealth_address,
        ephemeral_public_key: *ephemeral.public_key(),
        view_tag,
        stealth_public_key: encode_public_key(&stealth_pk)?,
    })
}

/// Builds an ephemeral key pair from a known private key.
pub fn ephemeral_from_secret(secret: CurveSecretKey) -> Result<EphemeralKeyPair> {
    let public = crate::keys::public_key_of(&secret)?;
    Ok(EphemeralKeyPair::new(public, secret))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Stealth payment: address to send to and announcement to publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthPayment {
    /// The one-time address to send funds to
    pub stealth_address: Address,
    /// The stealth public key (for verification)
    pub stealth_public_key: CurvePublicKey,
    /// The announcement to append to the log
    pub announcement: AnnouncedStealth,
}

/// Creates an Ethereum stealth payment with an opaque payload.
pub fn create_stealth_payment<R>(
    meta_address: &MetaAddress,
    payload: Vec<u8>,
    rng: &mut R,
) -> Result<StealthPayment>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let generated = generate_for_meta_address(meta_address, &EthereumAddressEncoder, rng)?;
    let stealth_public_key = generated.stealth_public_key;
    let announcement = generated.into_announcement(payload);
    announcement.validate()?;

    Ok(StealthPayment {
        stealth_address: announcement.stealth_address.clone(),
        stealth_public_key,
        announcement,
    })
}

/// Builder for stealth payments.
#[derive(Default)]
pub struct StealthPaymentBuilder {
    meta_address: Option<MetaAddress>,
    payload: Vec<u8>,
}

impl StealthPaymentBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient (required).
    pub fn recipient(mut self, meta_address: MetaAddress) -> Self {
        self.meta_address = Some(meta_address);
        self
    }

    /// Sets the announcement payload.
    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Generates the payment.
    pub fn build<R>(self, rng: &mut R) -> Result<StealthPayment>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let meta_address = self.meta_address.ok_or_else(|| {
            StealthError::ValidationError("recipient meta-address is required".into())
        })?;
        create_stealth_payment(&meta_address, self.payload, rng)
    }
}
