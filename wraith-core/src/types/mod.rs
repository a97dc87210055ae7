//! Domain types for WRAITH.
//!
//! This module provides all the core data structures used throughout the protocol:
//!
//! - [`StealthKeyPair`]: Spending + viewing key pairs of a recipient
//! - [`MetaAddress`]: Published address for receiving private payments
//! - [`Address`]: One-time ledger address for a specific payment
//! - [`AnnouncedStealth`]: Published ephemeral key + view tag
//! - [`OwnedStealthAddress`]: A recognised payment with its spending key

mod keys;
mod address;
mod announcement;
mod ownership;

pub use keys::*;
pub use address::*;
pub use announcement::*;
pub use ownership::*;
