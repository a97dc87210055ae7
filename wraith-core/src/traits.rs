//! Common traits for WRAITH.
//!
//! These traits define the interfaces that different implementations can satisfy,
//! enabling modularity and testing.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::AnnouncedStealth;

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENT LOG TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Lazy, finite sequence of log records in sequence-index order.
///
/// An `Err` item is a record that could not be decoded; consumers skip it
/// and keep reading.
pub type AnnouncementStream = BoxStream<'static, Result<AnnouncedStealth>>;

/// Interface for the append-only public announcement log.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - A local file
/// - On-chain storage (ERC-5564 `Announcement` events)
///
/// Delivery is at-least-once; scanning is idempotent so re-reads are safe.
#[async_trait]
pub trait AnnouncementLog: Send + Sync {
    /// Appends an announcement.
    ///
    /// Returns the assigned sequence index, which is strictly greater than
    /// every index assigned before it.
    async fn append(&self, announcement: AnnouncedStealth) -> Result<u64>;

    /// Reads every record with `sequence_index >= from_index`.
    ///
    /// The stream is a snapshot as of the call: records appended later are
    /// not included. Calling again restarts from the given index.
    async fn read(&self, from_index: u64) -> Result<AnnouncementStream>;

    /// Returns the number of records in the log.
    async fn len(&self) -> Result<u64>;

    /// Returns true if the log holds no records.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
