//! # WRAITH Stealth Address Protocol
//!
//! High-level API for creating and discovering stealth addresses.
//!
//! This crate provides:
//!
//! - **Key Generation**: Create WRAITH key sets (spending + viewing)
//! - **Meta-Address Creation**: Build publishable `st:eth:0x…` meta-addresses
//! - **Stealth Address Creation**: Generate one-time addresses for payments
//! - **Payment Discovery**: Scan announcements to find incoming payments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rand::rngs::OsRng;
//! use wraith_stealth::{create_stealth_payment, ScanControl, StealthWallet};
//!
//! // Recipient: Generate keys and publish meta-address
//! let wallet = StealthWallet::generate()?;
//! let meta_address = wallet.meta_address();
//!
//! // Sender: Create stealth payment
//! let payment = create_stealth_payment(meta_address, Vec::new(), &mut OsRng)?;
//! // Send funds to payment.stealth_address
//! // Append payment.announcement to the announcement log
//!
//! // Recipient: Discover payments
//! let report = wallet.scan(&announcements, &ScanControl::new())?;
//! for owned in &report.owned {
//!     println!("Found payment at: {}", owned.stealth_address());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod discovery;
pub mod keys;
pub mod payment;
pub mod wallet;

pub use discovery::{
    check_stealth_payments, detect_stealth_payments, AsRecord, CancelFlag, PaymentScanner,
    RecordOutcome, ScanAnomaly, ScanCheckpoint, ScanCompletion, ScanControl, ScanReport,
    ScanSession, ScanStats,
};
pub use keys::{
    generate_ephemeral_keypair, generate_keypair, generate_stealth_keys, stealth_keys_from_seed,
    validate_keypair, validate_stealth_keys,
};
pub use payment::{
    create_stealth_payment, derive_with_ephemeral, generate_for_meta_address,
    generate_stealth_address, StealthPayment, StealthPaymentBuilder,
};
pub use wallet::{StealthWallet, ViewingKeyExport, WalletConfig, WalletKeyFile};
