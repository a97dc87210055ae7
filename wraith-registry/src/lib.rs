//! # WRAITH Registry
//!
//! Announcement log adapters for the WRAITH protocol.
//!
//! This crate provides multiple backends:
//!
//! - **Memory**: Fast in-memory log for development and testing
//! - **File**: Persistent append-only file for single-node deployments
//! - **Feed**: Bounded channel turning pushed records into a pull stream
//!
//! ## Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use wraith_registry::{AnnouncementLog, MemoryLog};
//!
//! // Create in-memory log
//! let log = MemoryLog::new();
//!
//! // Append an announcement
//! let index = log.append(payment.announcement).await?;
//!
//! // Read everything from index 0
//! let mut records = log.read(0).await?;
//! while let Some(record) = records.next().await { /* ... */ }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod feed;
mod file;
mod memory;

pub use feed::{ChannelFeed, FeedSender};
pub use file::{FileLog, FileLogOptions};
pub use memory::MemoryLog;

// Re-export the trait from core
pub use wraith_core::traits::{AnnouncementLog, AnnouncementStream};
