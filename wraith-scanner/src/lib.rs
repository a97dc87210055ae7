//! # WRAITH Scanner
//!
//! Drives a [`PaymentScanner`] over an announcement log or a live feed.
//!
//! ## Features
//!
//! - **Batch Processing**: Pulls records in configurable batches, yielding
//!   to the runtime between them
//! - **Progress Reporting**: Callbacks for UI progress updates
//! - **Resumable Scans**: Checkpoints resume without rescanning
//! - **Concurrent Scanning**: Contiguous index ranges on blocking workers,
//!   merged back in log order
//!
//! ## Example
//!
//! ```rust,ignore
//! use wraith_scanner::{LogScanner, ScannerConfig};
//! use wraith_registry::MemoryLog;
//!
//! // Create scanner from wallet keys
//! let scanner = LogScanner::from_wallet(&wallet)?;
//!
//! // Scan all announcements
//! let report = scanner.scan_all(&log).await?;
//!
//! for payment in &report.owned {
//!     println!("Found payment at: {}", payment.stealth_address());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use wraith_core::constants::{DEFAULT_PROGRESS_INTERVAL, DEFAULT_SCAN_BATCH_SIZE};
use wraith_core::error::{Result, StealthError};
use wraith_core::traits::{AnnouncementLog, AnnouncementStream};
use wraith_core::types::{Address, AnnouncedStealth, DetectedStealthAddress, OwnedStealthAddress};
use wraith_crypto::{AddressEncoder, EthereumAddressEncoder};
use wraith_stealth::discovery::{
    CancelFlag, PaymentScanner, ScanCheckpoint, ScanCompletion, ScanControl, ScanReport, ScanStats,
};
use wraith_stealth::StealthWallet;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Scanner configuration.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Records pulled from the stream per batch
    pub batch_size: usize,
    /// Report progress every N records
    pub progress_interval: u64,
    /// Stop after this many records
    pub max_records: Option<u64>,
    /// Whether to stop on first discovery
    pub stop_on_first: bool,
    /// Blocking workers used by `scan_parallel`
    pub workers: usize,
    /// Give up after this long
    pub timeout: Option<Duration>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_records: None,
            stop_on_first: false,
            workers: 1,
            timeout: None,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets how often progress is reported.
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Caps the number of records scanned.
    pub fn max_records(mut self, max: u64) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Enables stopping on first discovery.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }

    /// Sets the number of parallel workers.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets an overall timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn control(&self, cancel: &CancelFlag) -> ScanControl {
        let mut control = ScanControl::new()
            .with_cancel_flag(cancel.clone())
            .stop_on_first(self.stop_on_first);
        if let Some(max) = self.max_records {
            control = control.with_max_records(max);
        }
        if let Some(timeout) = self.timeout {
            control = control.with_timeout(timeout);
        }
        control
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Total announcements to scan (0 when unknown, e.g. a live feed)
    pub total: u64,
    /// Announcements scanned so far
    pub scanned: u64,
    /// Discoveries found so far
    pub discoveries: u64,
    /// Current scan rate (announcements per second)
    pub rate: f64,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<f64>,
    /// Percentage complete (0-100)
    pub percent: f64,
}

impl ScanProgress {
    /// Creates a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            scanned: 0,
            discoveries: 0,
            rate: 0.0,
            eta_seconds: None,
            percent: 0.0,
        }
    }

    /// Updates progress with new values.
    pub fn update(&mut self, scanned: u64, discoveries: u64, elapsed_ms: u64) {
        self.scanned = scanned;
        self.discoveries = discoveries;

        if elapsed_ms > 0 {
            self.rate = (scanned as f64 / elapsed_ms as f64) * 1000.0;
        }

        if self.total > 0 {
            self.percent = (scanned as f64 / self.total as f64) * 100.0;

            if self.rate > 0.0 {
                let remaining = self.total.saturating_sub(scanned);
                self.eta_seconds = Some(remaining as f64 / self.rate);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Scans announcement logs for one recipient.
///
/// Statistics and the checkpoint accumulate across scans until [`reset`].
///
/// [`reset`]: LogScanner::reset
pub struct LogScanner<E = EthereumAddressEncoder> {
    scanner: Arc<PaymentScanner<E>>,
    cancel: CancelFlag,
    checkpoint: RwLock<ScanCheckpoint>,
    stats: RwLock<ScanStats>,
}

impl LogScanner<EthereumAddressEncoder> {
    /// Creates a scanner from a wallet.
    pub fn from_wallet(wallet: &StealthWallet) -> Result<Self> {
        Ok(Self::new(wallet.payment_scanner()?))
    }
}

impl<E: AddressEncoder + 'static> LogScanner<E> {
    /// Wraps a payment scanner.
    pub fn new(scanner: PaymentScanner<E>) -> Self {
        Self {
            scanner: Arc::new(scanner),
            cancel: CancelFlag::new(),
            checkpoint: RwLock::new(ScanCheckpoint::start()),
            stats: RwLock::new(ScanStats::new()),
        }
    }

    /// The flag that cancels scans run by this scanner.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Returns where the last scan left off.
    pub fn checkpoint(&self) -> ScanCheckpoint {
        *self.checkpoint.read()
    }

    /// Returns statistics accumulated over every scan.
    pub fn stats(&self) -> ScanStats {
        self.stats.read().clone()
    }

    /// Resets the checkpoint and statistics, and lowers the cancel flag.
    ///
    /// A cancelled scanner refuses every scan until it is reset.
    pub fn reset(&self) {
        self.cancel.reset();
        *self.checkpoint.write() = ScanCheckpoint::start();
        *self.stats.write() = ScanStats::new();
    }

    /// Scans the whole log.
    #[instrument(skip(self, log))]
    pub async fn scan_all(&self, log: &dyn AnnouncementLog) -> Result<ScanReport> {
        self.scan_from(log, ScanCheckpoint::start(), ScannerConfig::default()).await
    }

    /// Scans records added since the last scan.
    #[instrument(skip(self, log))]
    pub async fn scan_new(&self, log: &dyn AnnouncementLog) -> Result<ScanReport> {
        self.scan_from(log, self.checkpoint(), ScannerConfig::default()).await
    }

    /// Scans the log from `checkpoint`.
    #[instrument(skip(self, log, config))]
    pub async fn scan_from(
        &self,
        log: &dyn AnnouncementLog,
        checkpoint: ScanCheckpoint,
        config: ScannerConfig,
    ) -> Result<ScanReport> {
        let stream = log.read(checkpoint.next_index()).await?;
        self.run(stream, checkpoint, &config, None, 0).await
    }

    /// Scans the log from `checkpoint` with progress reporting.
    #[instrument(skip(self, log, config, progress_callback))]
    pub async fn scan_with_progress(
        &self,
        log: &dyn AnnouncementLog,
        checkpoint: ScanCheckpoint,
        config: ScannerConfig,
        progress_callback: ProgressCallback,
    ) -> Result<ScanReport> {
        let total = log.len().await?.saturating_sub(checkpoint.next_index());
        let stream = log.read(checkpoint.next_index()).await?;
        self.run(stream, checkpoint, &config, Some(&progress_callback), total)
            .await
    }

    /// Scans an arbitrary stream, such as a live channel feed.
    ///
    /// Ends when the stream ends or a stop condition in `config` triggers.
    pub async fn scan_stream(
        &self,
        stream: AnnouncementStream,
        checkpoint: ScanCheckpoint,
        config: ScannerConfig,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ScanReport> {
        self.run(stream, checkpoint, &config, progress_callback.as_ref(), 0)
            .await
    }

    async fn run(
        &self,
        stream: AnnouncementStream,
        checkpoint: ScanCheckpoint,
        config: &ScannerConfig,
        progress_callback: Option<&ProgressCallback>,
        total: u64,
    ) -> Result<ScanReport> {
        let start = Instant::now();
        let control = config.control(&self.cancel);
        let mut session = self.scanner.session(checkpoint, &control);
        let mut progress = ScanProgress::new(total);
        let mut last_reported = 0u64;

        info!(from_index = checkpoint.next_index(), "Starting scan");

        let mut batches = stream.ready_chunks(config.batch_size.max(1));
        let mut completion = ScanCompletion::Exhausted;

        'outer: while let Some(batch) = batches.next().await {
            debug!(size = batch.len(), "Scanning batch");
            for item in &batch {
                if let ControlFlow::Break(reason) = session.feed(item)? {
                    completion = reason;
                    break 'outer;
                }

                if let Some(callback) = progress_callback {
                    let stats = session.stats();
                    if stats.total_scanned >= last_reported + config.progress_interval {
                        last_reported = stats.total_scanned;
                        progress.update(
                            stats.total_scanned,
                            stats.discoveries(),
                            start.elapsed().as_millis() as u64,
                        );
                        callback(progress.clone());
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        let report = session.finish(completion);

        if let Some(callback) = progress_callback {
            progress.update(
                report.stats.total_scanned,
                report.stats.discoveries(),
                start.elapsed().as_millis() as u64,
            );
            callback(progress);
        }

        self.absorb(&report);
        Ok(report)
    }

    /// Scans a snapshot of the log on `config.workers` blocking threads.
    ///
    /// The snapshot is split into contiguous index ranges and the per-range
    /// reports are merged in log order, so the result matches a sequential
    /// scan. If one range stops early, later ranges are discarded and the
    /// checkpoint points at the first unscanned record.
    #[instrument(skip(self, log, config))]
    pub async fn scan_parallel(
        &self,
        log: &dyn AnnouncementLog,
        checkpoint: ScanCheckpoint,
        config: ScannerConfig,
    ) -> Result<ScanReport> {
        if config.stop_on_first || config.workers <= 1 {
            return self.scan_from(log, checkpoint, config).await;
        }

        let start = Instant::now();
        let mut records: Vec<Result<AnnouncedStealth>> =
            log.read(checkpoint.next_index()).await?.collect().await;

        let mut truncated = false;
        if let Some(max) = config.max_records {
            let max = usize::try_from(max).unwrap_or(usize::MAX);
            if records.len() > max {
                records.truncate(max);
                truncated = true;
            }
        }

        let chunk_size = records.len().div_ceil(config.workers).max(1);
        info!(
            records = records.len(),
            workers = config.workers,
            chunk_size,
            "Starting parallel scan"
        );

        // Caps are applied to the snapshot above; workers only honour
        // cancellation and the deadline.
        let worker_config = ScannerConfig {
            max_records: None,
            ..config.clone()
        };
        let control = worker_config.control(&self.cancel);

        let mut handles = Vec::new();
        let mut records = records.into_iter();
        loop {
            let chunk: Vec<_> = records.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let scanner = Arc::clone(&self.scanner);
            let control = control.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                scanner.scan_from(chunk, checkpoint, &control)
            }));
        }

        let mut merged = ScanReport::empty(checkpoint);
        let mut stopped = false;
        for handle in handles {
            let report = handle
                .await
                .map_err(|e| StealthError::InternalError(format!("scan worker failed: {e}")))??;
            if stopped {
                continue;
            }
            merged.extend(report);
            stopped = merged.completion.is_partial();
        }

        if truncated && !merged.completion.is_partial() {
            merged.completion = ScanCompletion::RecordLimit;
        }
        merged.stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            owned = merged.owned.len(),
            detected = merged.detected.len(),
            scanned = merged.stats.total_scanned,
            completion = ?merged.completion,
            "Parallel scan complete"
        );

        self.absorb(&merged);
        Ok(merged)
    }

    fn absorb(&self, report: &ScanReport) {
        self.stats.write().merge(&report.stats);
        let mut checkpoint = self.checkpoint.write();
        *checkpoint = (*checkpoint).max(report.checkpoint);

        if !report.anomalies.is_empty() {
            warn!(count = report.anomalies.len(), "Scan skipped malformed records");
        }
        info!(
            owned = report.owned.len(),
            detected = report.detected.len(),
            scanned = report.stats.total_scanned,
            duration_ms = report.stats.duration_ms,
            rate = format!("{:.2}/s", report.stats.rate()),
            "Scan complete"
        );
    }
}

impl<E> std::fmt::Debug for LogScanner<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogScanner")
            .field("scanner", &self.scanner)
            .field("checkpoint", &*self.checkpoint.read())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A scan result carrying a stealth address.
pub trait StealthMatch {
    /// The matched one-time address.
    fn stealth_address(&self) -> &Address;
}

impl StealthMatch for OwnedStealthAddress {
    fn stealth_address(&self) -> &Address {
        OwnedStealthAddress::stealth_address(self)
    }
}

impl StealthMatch for DetectedStealthAddress {
    fn stealth_address(&self) -> &Address {
        &self.stealth_address
    }
}

/// Drops repeated addresses, keeping the first occurrence.
///
/// Logs deliver at least once, so the same announcement can be scanned
/// twice; this collapses the duplicates.
pub fn dedup_by_address<T: StealthMatch>(matches: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.stealth_address().clone()))
        .collect()
}

/// Scan result summary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of announcements scanned
    pub total_scanned: u64,
    /// Number of view tag matches
    pub view_tag_matches: u64,
    /// Number of payments discovered
    pub discoveries: u64,
    /// Number of malformed records skipped
    pub malformed: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
    /// Filter efficiency (% filtered by view tag)
    pub filter_efficiency: f64,
    /// Where to resume
    pub next_index: u64,
    /// Why the scan stopped
    pub completion: ScanCompletion,
}

impl From<&ScanReport> for ScanSummary {
    fn from(report: &ScanReport) -> Self {
        let stats = &report.stats;
        Self {
            total_scanned: stats.total_scanned,
            view_tag_matches: stats.view_tag_matches,
            discoveries: stats.discoveries(),
            malformed: stats.malformed,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
            filter_efficiency: stats.filter_efficiency(),
            next_index: report.checkpoint.next_index(),
            completion: report.completion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use wraith_registry::{ChannelFeed, MemoryLog};
    use wraith_stealth::{create_stealth_payment, WalletConfig};

    fn wallet(seed: u64) -> StealthWallet {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        StealthWallet::generate_with_rng(&mut rng, WalletConfig::default()).unwrap()
    }

    fn announcement_for(wallet: &StealthWallet) -> AnnouncedStealth {
        create_stealth_payment(wallet.meta_address(), Vec::new(), &mut OsRng)
            .unwrap()
            .announcement
    }

    /// Appends `ours` payments to `recipient` interleaved with `others` for a stranger.
    async fn populate(log: &MemoryLog, recipient: &StealthWallet, ours: usize, others: usize) {
        let stranger = wallet(999);
        for i in 0..ours.max(others) {
            if i < others {
                log.append(announcement_for(&stranger)).await.unwrap();
            }
            if i < ours {
                log.append(announcement_for(recipient)).await.unwrap();
            }
        }
    }

    fn indices(report: &ScanReport) -> Vec<u64> {
        report.owned.iter().map(|o| o.sequence_index()).collect()
    }

    #[test]
    fn test_scan_empty_log() {
        let scanner = LogScanner::from_wallet(&wallet(1)).unwrap();
        let report = tokio_test::block_on(scanner.scan_all(&MemoryLog::new())).unwrap();
        assert!(report.owned.is_empty());
        assert_eq!(report.completion, ScanCompletion::Exhausted);
    }

    #[tokio::test]
    async fn test_scan_finds_payments() {
        let recipient = wallet(2);
        let log = MemoryLog::new();
        populate(&log, &recipient, 3, 5).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let report = scanner.scan_all(&log).await.unwrap();

        assert_eq!(report.owned.len(), 3);
        assert_eq!(report.stats.total_scanned, 8);
        assert_eq!(report.checkpoint.next_index(), 8);
    }

    #[tokio::test]
    async fn test_scan_new_resumes_from_checkpoint() {
        let recipient = wallet(3);
        let log = MemoryLog::new();
        populate(&log, &recipient, 2, 2).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        scanner.scan_new(&log).await.unwrap();
        assert_eq!(scanner.checkpoint().next_index(), 4);

        log.append(announcement_for(&recipient)).await.unwrap();
        let report = scanner.scan_new(&log).await.unwrap();

        assert_eq!(indices(&report), vec![4]);
        assert_eq!(report.stats.total_scanned, 1);
        assert_eq!(scanner.stats().total_scanned, 5);

        scanner.reset();
        assert_eq!(scanner.checkpoint(), ScanCheckpoint::start());
        assert_eq!(scanner.stats().total_scanned, 0);
    }

    #[tokio::test]
    async fn test_scan_stop_on_first() {
        let recipient = wallet(4);
        let log = MemoryLog::new();
        populate(&log, &recipient, 5, 0).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let config = ScannerConfig::new().stop_on_first();
        let report = scanner.scan_from(&log, ScanCheckpoint::start(), config).await.unwrap();

        assert_eq!(report.owned.len(), 1);
        assert_eq!(report.completion, ScanCompletion::FirstMatch);
    }

    #[tokio::test]
    async fn test_scan_record_limit_across_batches() {
        let recipient = wallet(5);
        let log = MemoryLog::new();
        populate(&log, &recipient, 10, 0).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let config = ScannerConfig::new().batch_size(3).max_records(7);
        let report = scanner.scan_from(&log, ScanCheckpoint::start(), config).await.unwrap();

        assert_eq!(report.completion, ScanCompletion::RecordLimit);
        assert_eq!(report.owned.len(), 7);
        assert_eq!(report.checkpoint.next_index(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let recipient = wallet(6);
        let log = MemoryLog::new();
        populate(&log, &recipient, 3, 0).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        scanner.cancel_flag().cancel();
        let report = scanner.scan_all(&log).await.unwrap();

        assert_eq!(report.completion, ScanCompletion::Cancelled);
        assert!(report.owned.is_empty());
    }

    #[tokio::test]
    async fn test_reset_after_cancel_scans_again() {
        let recipient = wallet(14);
        let log = MemoryLog::new();
        populate(&log, &recipient, 1, 0).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        scanner.cancel_flag().cancel();
        let first = scanner.scan_all(&log).await.unwrap();
        assert_eq!(first.completion, ScanCompletion::Cancelled);

        // Still cancelled until reset.
        let again = scanner.scan_new(&log).await.unwrap();
        assert_eq!(again.completion, ScanCompletion::Cancelled);

        scanner.reset();
        assert!(!scanner.cancel_flag().is_cancelled());
        let report = scanner.scan_all(&log).await.unwrap();
        assert_eq!(report.completion, ScanCompletion::Exhausted);
        assert_eq!(indices(&report), vec![0]);
    }

    #[tokio::test]
    async fn test_scan_progress_callback() {
        let recipient = wallet(7);
        let log = MemoryLog::new();
        populate(&log, &recipient, 20, 130).await;

        let updates = Arc::new(RwLock::new(Vec::new()));
        let updates_clone = updates.clone();
        let callback: ProgressCallback = Box::new(move |progress| {
            updates_clone.write().push(progress);
        });

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let config = ScannerConfig::new().progress_interval(50);
        scanner
            .scan_with_progress(&log, ScanCheckpoint::start(), config, callback)
            .await
            .unwrap();

        let updates = updates.read();
        assert_eq!(updates.len(), 4);
        let last = updates.last().unwrap();
        assert_eq!(last.scanned, 150);
        assert_eq!(last.discoveries, 20);
        assert!(last.percent >= 99.0);
    }

    #[tokio::test]
    async fn test_scan_stream_from_feed() {
        let recipient = wallet(8);
        let stranger = wallet(9);
        let (sender, stream) = ChannelFeed::with_capacity(2);

        let ours = announcement_for(&recipient);
        let theirs = announcement_for(&stranger);
        let producer = tokio::spawn(async move {
            sender.send(theirs).await.unwrap();
            sender.send_malformed("bad event").await.unwrap();
            sender.send(ours).await.unwrap();
        });

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let report = scanner
            .scan_stream(stream, ScanCheckpoint::start(), ScannerConfig::new(), None)
            .await
            .unwrap();
        producer.await.unwrap();

        assert_eq!(indices(&report), vec![2]);
        assert_eq!(report.stats.malformed, 1);
        assert_eq!(report.checkpoint.next_index(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_scan_equals_sequential() {
        let recipient = wallet(10);
        let log = MemoryLog::new();
        populate(&log, &recipient, 7, 30).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let sequential = scanner
            .scan_from(&log, ScanCheckpoint::start(), ScannerConfig::new())
            .await
            .unwrap();
        let parallel = scanner
            .scan_parallel(&log, ScanCheckpoint::start(), ScannerConfig::new().workers(4))
            .await
            .unwrap();

        assert_eq!(indices(&parallel), indices(&sequential));
        assert_eq!(parallel.checkpoint, sequential.checkpoint);
        assert_eq!(parallel.stats.total_scanned, sequential.stats.total_scanned);
        assert_eq!(parallel.stats.view_tag_matches, sequential.stats.view_tag_matches);
        assert_eq!(parallel.completion, ScanCompletion::Exhausted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_scan_respects_record_limit() {
        let recipient = wallet(11);
        let log = MemoryLog::new();
        populate(&log, &recipient, 10, 0).await;

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let config = ScannerConfig::new().workers(3).max_records(5);
        let report = scanner.scan_parallel(&log, ScanCheckpoint::start(), config).await.unwrap();

        assert_eq!(indices(&report), vec![0, 1, 2, 3, 4]);
        assert_eq!(report.completion, ScanCompletion::RecordLimit);
        assert_eq!(report.checkpoint.next_index(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_dedup() {
        let recipient = wallet(12);
        let payment = announcement_for(&recipient);
        let (sender, stream) = ChannelFeed::with_capacity(4);
        sender.send(payment.clone()).await.unwrap();
        sender.send(payment).await.unwrap();
        drop(sender);

        let scanner = LogScanner::from_wallet(&recipient).unwrap();
        let report = scanner
            .scan_stream(stream, ScanCheckpoint::start(), ScannerConfig::new(), None)
            .await
            .unwrap();

        assert_eq!(report.owned.len(), 2);
        let unique = dedup_by_address(report.owned);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].sequence_index(), 0);
    }

    #[tokio::test]
    async fn test_view_only_scanner() {
        let recipient = wallet(13);
        let log = MemoryLog::new();
        populate(&log, &recipient, 2, 2).await;

        let scanner = LogScanner::new(PaymentScanner::view_only(&recipient.viewing_key()).unwrap());
        let report = scanner.scan_all(&log).await.unwrap();

        assert!(report.owned.is_empty());
        assert_eq!(dedup_by_address(report.detected).len(), 2);
    }

    #[test]
    fn test_summary_from_report() {
        let mut report = ScanReport::empty(ScanCheckpoint::at(12));
        report.stats.total_scanned = 200;
        report.stats.view_tag_matches = 2;
        report.stats.owned = 1;
        report.stats.collisions = 1;
        report.completion = ScanCompletion::Deadline;

        let summary = ScanSummary::from(&report);
        assert_eq!(summary.discoveries, 1);
        assert_eq!(summary.next_index, 12);
        assert!((summary.filter_efficiency - 99.0).abs() < 1e-9);
        assert_eq!(summary.completion, ScanCompletion::Deadline);
    }

    #[test]
    fn test_scan_progress_eta() {
        let mut progress = ScanProgress::new(1000);

        // Simulate 500 scanned in 1000ms (500/s rate)
        progress.update(500, 2, 1000);

        assert!((progress.percent - 50.0).abs() < 0.1);
        assert!((progress.rate - 500.0).abs() < 1.0);

        // ETA should be ~1 second for remaining 500
        assert!(progress.eta_seconds.is_some());
        assert!((progress.eta_seconds.unwrap() - 1.0).abs() < 0.1);
    }
}
