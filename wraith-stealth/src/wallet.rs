//! WRAITH wallet implementation.
//!
//! The wallet manages the recipient key set and provides high-level
//! operations for receiving stealth payments.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use wraith_core::error::{Result, StealthError};
use wraith_core::types::{
    CurvePublicKey, CurveSecretKey, KeyPair, MetaAddress, StealthKeyPair, ViewingKey,
};

use crate::discovery::{AsRecord, PaymentScanner, ScanCheckpoint, ScanControl, ScanReport};
use crate::keys::{generate_stealth_keys, public_key_of, stealth_keys_from_seed, validate_stealth_keys};

/// Key file format version.
pub const KEY_FILE_VERSION: u8 = 1;

/// Configuration for wallet creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Optional human-readable label
    pub label: Option<String>,
}

impl WalletConfig {
    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A WRAITH wallet containing keys for receiving private payments.
///
/// The wallet holds:
/// - Spending keys: For deriving stealth private keys and spending funds
/// - Viewing keys: For scanning announcements (can be shared with auditors)
#[derive(ZeroizeOnDrop)]
pub struct StealthWallet {
    /// The complete key set (spending + viewing)
    keys: StealthKeyPair,
    /// Cached meta-address
    #[zeroize(skip)]
    meta_address: MetaAddress,
    /// Wallet configuration
    #[zeroize(skip)]
    config: WalletConfig,
}

impl StealthWallet {
    /// Generates a new wallet with keys from the operating system RNG.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use wraith_stealth::StealthWallet;
    ///
    /// let wallet = StealthWallet::generate()?;
    /// println!("Meta-address: {}", wallet.meta_address());
    /// ```
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng, WalletConfig::default())
    }

    /// Generates a new wallet from the given RNG.
    pub fn generate_with_rng<R>(rng: &mut R, config: WalletConfig) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let keys = generate_stealth_keys(rng)?;
        Ok(Self::assemble(keys, config))
    }

    /// Derives a wallet deterministically from a seed of at least 16 bytes.
    pub fn from_seed(seed: &[u8], config: WalletConfig) -> Result<Self> {
        let keys = stealth_keys_from_seed(seed)?;
        Ok(Self::assemble(keys, config))
    }

    /// Creates a wallet from existing keys.
    ///
    /// # Errors
    /// Rejects key sets whose public halves do not match their private halves.
    pub fn from_keys(keys: StealthKeyPair, config: WalletConfig) -> Result<Self> {
        validate_stealth_keys(&keys)?;
        Ok(Self::assemble(keys, config))
    }

    fn assemble(keys: StealthKeyPair, config: WalletConfig) -> Self {
        let meta_address = keys.meta_address();
        Self {
            keys,
            meta_address,
            config,
        }
    }

    /// Returns the meta-address for publishing.
    ///
    /// This is what recipients share so others can send them payments.
    pub fn meta_address(&self) -> &MetaAddress {
        &self.meta_address
    }

    /// Returns the wallet configuration.
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Returns the full key set.
    pub fn keys(&self) -> &StealthKeyPair {
        &self.keys
    }

    /// Returns the view-only capability for a scanning service or auditor.
    pub fn viewing_key(&self) -> ViewingKey {
        self.keys.viewing_key()
    }

    /// Exports the viewing key in hex form.
    ///
    /// The export allows scanning for payments but not spending them.
    pub fn export_viewing_key(&self) -> ViewingKeyExport {
        ViewingKeyExport::from_viewing_key(&self.viewing_key())
    }

    /// Builds a scanner that can recover stealth spending keys.
    pub fn payment_scanner(&self) -> Result<PaymentScanner> {
        PaymentScanner::from_keys(&self.keys)
    }

    /// Scans records for payments to this wallet.
    pub fn scan<I>(&self, records: I, control: &ScanControl) -> Result<ScanReport>
    where
        I: IntoIterator,
        I::Item: AsRecord,
    {
        self.payment_scanner()?.scan(records, control)
    }

    /// Scans records starting from a checkpoint.
    pub fn scan_from<I>(
        &self,
        records: I,
        checkpoint: ScanCheckpoint,
        control: &ScanControl,
    ) -> Result<ScanReport>
    where
        I: IntoIterator,
        I::Item: AsRecord,
    {
        self.payment_scanner()?.scan_from(records, checkpoint, control)
    }

    /// Serializes the private keys into a key file.
    pub fn to_key_file(&self) -> WalletKeyFile {
        WalletKeyFile {
            version: KEY_FILE_VERSION,
            label: self.config.label.clone(),
            spending_private_key: hex::encode(self.keys.spending_private_key().as_bytes()),
            viewing_private_key: hex::encode(self.keys.viewing_private_key().as_bytes()),
        }
    }

    /// Restores a wallet from a key file.
    pub fn from_key_file(file: &WalletKeyFile) -> Result<Self> {
        if file.version != KEY_FILE_VERSION {
            return Err(StealthError::VersionMismatch {
                expected: KEY_FILE_VERSION,
                actual: file.version,
            });
        }

        let spending = keypair_from_hex(&file.spending_private_key)?;
        let viewing = keypair_from_hex(&file.viewing_private_key)?;
        let config = WalletConfig {
            label: file.label.clone(),
        };
        Self::from_keys(StealthKeyPair::new(spending, viewing), config)
    }
}

fn keypair_from_hex(secret_hex: &str) -> Result<KeyPair> {
    let secret = CurveSecretKey::from_hex(secret_hex)?;
    let public = public_key_of(&secret)?;
    Ok(KeyPair::new(public, secret))
}

impl std::fmt::Debug for StealthWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthWallet")
            .field("meta_address", &self.meta_address)
            .field("config", &self.config)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Exported viewing key.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ViewingKeyExport {
    /// Viewing private key (hex)
    pub viewing_private_key: String,
    /// Spending public key (hex)
    #[zeroize(skip)]
    pub spending_public_key: String,
}

impl ViewingKeyExport {
    /// Encodes a viewing key.
    pub fn from_viewing_key(key: &ViewingKey) -> Self {
        Self {
            viewing_private_key: hex::encode(key.viewing_private_key().as_bytes()),
            spending_public_key: key.spending_public_key().to_hex(),
        }
    }

    /// Decodes the viewing key.
    pub fn to_viewing_key(&self) -> Result<ViewingKey> {
        let secret = CurveSecretKey::from_hex(&self.viewing_private_key)?;
        let spending = CurvePublicKey::from_hex(&self.spending_public_key)?;
        wraith_crypto::parse_public_key(&spending)?;
        Ok(ViewingKey::new(secret, spending))
    }
}

impl std::fmt::Debug for ViewingKeyExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewingKeyExport")
            .field("viewing_private_key", &"[REDACTED]")
            .field("spending_public_key", &self.spending_public_key)
            .finish()
    }
}

/// On-disk wallet keys (unencrypted hex).
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct WalletKeyFile {
    /// Format version for forward compatibility
    #[zeroize(skip)]
    pub version: u8,
    /// Wallet label
    #[zeroize(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Spending private key (hex)
    pub spending_private_key: String,
    /// Viewing private key (hex)
    pub viewing_private_key: String,
}

impl std::fmt::Debug for WalletKeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeyFile")
            .field("version", &self.version)
            .field("label", &self.label)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}
