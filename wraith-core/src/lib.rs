//! # WRAITH Core
//!
//! Core types, errors, and traits for the WRAITH dual-key stealth address protocol.
//!
//! This crate provides the foundational building blocks used by all other WRAITH crates:
//!
//! - **Types**: Domain models for keys, addresses, announcements, and scan results
//! - **Errors**: One error enum shared across the workspace
//! - **Constants**: Protocol constants and sizes
//! - **Traits**: The announcement log interface
//!
//! ## Example
//!
//! ```rust,ignore
//! use wraith_core::{MetaAddress, StealthError};
//!
//! let meta: MetaAddress = "st:eth:0x02...".parse()?;
//! let json = serde_json::to_string(&meta)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, StealthError};
pub use traits::*;
pub use types::*;
