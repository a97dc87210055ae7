//! Push-to-pull bridge for live announcement delivery.
//!
//! Subscription sources (an event listener, a websocket) push records into a
//! [`FeedSender`]; the scanner pulls them from the paired
//! [`AnnouncementStream`]. The channel is bounded, so a slow scanner applies
//! backpressure to the producer instead of buffering without limit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use wraith_core::constants::DEFAULT_FEED_CAPACITY;
use wraith_core::error::{Result, StealthError};
use wraith_core::traits::AnnouncementStream;
use wraith_core::types::AnnouncedStealth;

/// Constructor for bounded feeds.
pub struct ChannelFeed;

impl ChannelFeed {
    /// Creates a feed with the default capacity.
    pub fn new() -> (FeedSender, AnnouncementStream) {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Creates a feed holding at most `capacity` undelivered records.
    pub fn with_capacity(capacity: usize) -> (FeedSender, AnnouncementStream) {
        Self::starting_at(capacity, 0)
    }

    /// Creates a feed whose records continue an existing log at `next_index`.
    pub fn starting_at(capacity: usize, next_index: u64) -> (FeedSender, AnnouncementStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sender = FeedSender {
            tx,
            next_index: Arc::new(AtomicU64::new(next_index)),
        };
        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();
        (sender, stream)
    }
}

/// Producer half of a feed. Cheap to clone; the stream ends once every
/// clone is dropped.
#[derive(Clone, Debug)]
pub struct FeedSender {
    tx: mpsc::Sender<Result<AnnouncedStealth>>,
    next_index: Arc<AtomicU64>,
}

impl FeedSender {
    /// Pushes a record, assigning the next sequence index.
    ///
    /// Waits while the feed is full.
    ///
    /// # Errors
    /// `FeedClosed` once the consuming stream has been dropped.
    pub async fn send(&self, mut announcement: AnnouncedStealth) -> Result<u64> {
        let permit = self.tx.reserve().await.map_err(|_| StealthError::FeedClosed)?;
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        announcement.sequence_index = index;

        trace!(sequence_index = index, "Feeding announcement");
        permit.send(Ok(announcement));
        Ok(index)
    }

    /// Pushes a record the producer could not decode.
    ///
    /// The slot still consumes a sequence index so later records keep their
    /// positions.
    pub async fn send_malformed(&self, reason: impl Into<String>) -> Result<u64> {
        let permit = self.tx.reserve().await.map_err(|_| StealthError::FeedClosed)?;
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);

        debug!(sequence_index = index, "Feeding malformed record");
        permit.send(Err(StealthError::malformed(Some(index), reason)));
        Ok(index)
    }

    /// Returns true once the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// The index the next record will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index.load(Ordering::SeqCst)
    }
}
