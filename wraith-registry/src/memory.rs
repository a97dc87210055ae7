//! In-memory announcement log.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use wraith_core::error::Result;
use wraith_core::traits::{AnnouncementLog, AnnouncementStream};
use wraith_core::types::{AnnouncedStealth, AnnouncementStats};

/// In-memory announcement log.
///
/// Records live in a `Vec` whose position is the sequence index, so reads
/// from any index are a slice copy.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently. Appends
/// are serialized by the write lock, which is what makes indices dense.
#[derive(Debug, Default)]
pub struct MemoryLog {
    /// Records in sequence-index order
    records: RwLock<Vec<AnnouncedStealth>>,
    /// Log statistics
    stats: RwLock<AnnouncementStats>,
}

impl MemoryLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(Vec::with_capacity(capacity)),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.stats.read().clone()
    }

    /// Clears all records and restarts indices at 0.
    pub fn clear(&self) {
        self.records.write().clear();
        *self.stats.write() = AnnouncementStats::new();
    }

    /// Returns the number of records without awaiting.
    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    /// Returns the record at `sequence_index`.
    pub fn get(&self, sequence_index: u64) -> Option<AnnouncedStealth> {
        let index = usize::try_from(sequence_index).ok()?;
        self.records.read().get(index).cloned()
    }

    /// Returns a copy of every record at or after `from_index`.
    pub fn snapshot(&self, from_index: u64) -> Vec<AnnouncedStealth> {
        let records = self.records.read();
        let start = usize::try_from(from_index).unwrap_or(usize::MAX).min(records.len());
        records[start..].to_vec()
    }

    /// Appends records in order, assigning fresh indices.
    ///
    /// Useful for restoring from backup or syncing from another source.
    /// Stops at the first invalid record; earlier records stay appended.
    pub fn import(&self, announcements: Vec<AnnouncedStealth>) -> Result<usize> {
        let mut imported = 0;
        for announcement in announcements {
            self.push(announcement)?;
            imported += 1;
        }
        Ok(imported)
    }

    fn push(&self, mut announcement: AnnouncedStealth) -> Result<u64> {
        announcement.validate()?;

        let mut records = self.records.write();
        let index = records.len() as u64;
        announcement.sequence_index = index;

        self.stats.write().add(&announcement);
        records.push(announcement);
        Ok(index)
    }
}

#[async_trait]
impl AnnouncementLog for MemoryLog {
    /// Validates the announcement and appends it at the next index.
    #[instrument(skip(self, announcement), fields(view_tag = announcement.view_tag()))]
    async fn append(&self, announcement: AnnouncedStealth) -> Result<u64> {
        let index = self.push(announcement)?;
        debug!(sequence_index = index, "Appended announcement");
        Ok(index)
    }

    #[instrument(skip(self))]
    async fn read(&self, from_index: u64) -> Result<AnnouncementStream> {
        let snapshot = self.snapshot(from_index);
        debug!(from_index, count = snapshot.len(), "Reading announcements");
        Ok(stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use futures::TryStreamExt;
    use tokio::task::JoinSet;
    use wraith_core::types::{Address, CurvePublicKey, StealthMetadata};

    const GENERATOR: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn make_test_announcement(view_tag: u8) -> AnnouncedStealth {
        AnnouncedStealth::new(
            Address::from_eth([view_tag; 20]),
            StealthMetadata::new(CurvePublicKey::from_hex(GENERATOR).unwrap(), view_tag),
            vec![view_tag],
        )
    }

    #[tokio::test]
    async fn test_append_assigns_dense_indices() {
        let log = MemoryLog::new();

        for expected in 0..3u64 {
            let index = log.append(make_test_announcement(expected as u8)).await.unwrap();
            assert_eq!(index, expected);
        }
        assert_eq!(log.len().await.unwrap(), 3);
        assert_eq!(log.get(1).unwrap().sequence_index, 1);
        assert!(log.get(3).is_none());
    }

    #[tokio::test]
    async fn test_read_from_index() {
        let log = MemoryLog::new();
        for tag in 0..5u8 {
            log.append(make_test_announcement(tag)).await.unwrap();
        }

        let records: Vec<_> = log.read(2).await.unwrap().try_collect().await.unwrap();
        let indices: Vec<u64> = records.iter().map(|r| r.sequence_index).collect();
        assert_eq!(indices, vec![2, 3, 4]);

        let none: Vec<_> = log.read(99).await.unwrap().try_collect().await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_read_is_snapshot() {
        let log = MemoryLog::new();
        log.append(make_test_announcement(1)).await.unwrap();

        let stream = log.read(0).await.unwrap();
        log.append(make_test_announcement(2)).await.unwrap();

        let records: Vec<_> = stream.try_collect().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_read_is_restartable() {
        let log = MemoryLog::new();
        log.append(make_test_announcement(1)).await.unwrap();
        log.append(make_test_announcement(2)).await.unwrap();

        let first: Vec<_> = log.read(0).await.unwrap().try_collect().await.unwrap();
        let second: Vec<_> = log.read(0).await.unwrap().try_collect().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stats() {
        let log = MemoryLog::new();

        log.append(make_test_announcement(0x42)).await.unwrap();
        log.append(make_test_announcement(0x42)).await.unwrap();
        log.append(make_test_announcement(0x00)).await.unwrap();

        let stats = log.stats();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.view_tag_distribution[0x42], 2);
        assert_eq!(stats.view_tag_distribution[0x00], 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let log = MemoryLog::new();
        log.append(make_test_announcement(0x01)).await.unwrap();
        log.append(make_test_announcement(0x02)).await.unwrap();

        log.clear();

        assert!(log.is_empty().await.unwrap());
        assert_eq!(log.append(make_test_announcement(0x03)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_export() {
        let log1 = MemoryLog::new();
        log1.append(make_test_announcement(0x01)).await.unwrap();
        log1.append(make_test_announcement(0x02)).await.unwrap();

        let log2 = MemoryLog::with_capacity(2);
        let imported = log2.import(log1.snapshot(0)).unwrap();
        assert_eq!(imported, 2);
        assert_eq!(log2.snapshot(0), log1.snapshot(0));
    }

    #[tokio::test]
    async fn test_concurrent_append() {
        let log = Arc::new(MemoryLog::new());
        let mut tasks = JoinSet::new();

        for i in 0..100u8 {
            let log = log.clone();
            tasks.spawn(async move { log.append(make_test_announcement(i)).await.unwrap() });
        }

        let mut indices = Vec::new();
        while let Some(result) = tasks.join_next().await {
            indices.push(result.unwrap());
        }
        indices.sort_unstable();

        assert_eq!(indices, (0..100).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_invalid_announcement_rejected() {
        let log = MemoryLog::new();
        let mut invalid = make_test_announcement(0x00);
        invalid.scheme_id = 2;

        assert!(log.append(invalid).await.is_err());
        assert!(log.is_empty().await.unwrap());
    }
}
