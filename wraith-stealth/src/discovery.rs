//! Payment discovery (recipient scan).
//!
//! For every announcement, in log order:
//!
//! ```text
//! s' = hash_to_scalar(v · R)
//! view tag mismatch          -> NotOurs (one ECDH, nothing else)
//! P' = K + s'·G, encode      -> ViewTagCollision if the address differs
//! stealth_sk = k + s' mod n  -> Owned (or Detected without k)
//! ```
//!
//! Malformed records never abort a scan: they are reported as anomalies and
//! the scan moves on.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use wraith_core::error::{Result, StealthError};
use wraith_core::types::{
    AnnouncedStealth, CurvePublicKey, CurveSecretKey, DetectedStealthAddress,
    OwnedStealthAddress, StealthKeyPair, ViewingKey,
};
use wraith_crypto::{
    addresses_match, derive_stealth_address, derive_stealth_private_key, encode_secret_key,
    parse_public_key, parse_secret_key, public_key_for, shared_secret, verify_view_tag,
    AddressEncoder, EthereumAddressEncoder, NonZeroScalar, PublicKey,
};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of scanning a single announcement.
#[derive(Debug)]
pub enum RecordOutcome {
    /// View tag didn't match - not for this recipient
    NotOurs,
    /// View tag matched but the derived address did not (about 1 in 256)
    ViewTagCollision,
    /// Payment discovered, with its spending key
    Owned(OwnedStealthAddress),
    /// Payment discovered by a view-only scanner
    Detected(DetectedStealthAddress),
    /// Record could not be processed and was skipped
    Malformed(ScanAnomaly),
}

impl RecordOutcome {
    /// Returns true if the record belongs to this recipient.
    pub fn is_match(&self) -> bool {
        matches!(self, RecordOutcome::Owned(_) | RecordOutcome::Detected(_))
    }

    /// Returns the owned address if present.
    pub fn into_owned(self) -> Option<OwnedStealthAddress> {
        match self {
            RecordOutcome::Owned(owned) => Some(owned),
            _ => None,
        }
    }
}

/// A record skipped during a scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAnomaly {
    /// Sequence index of the record, when it could be read
    pub sequence_index: Option<u64>,
    /// Why the record was skipped
    pub reason: String,
}

impl ScanAnomaly {
    fn from_error(sequence_index: Option<u64>, error: &StealthError) -> Self {
        match error {
            StealthError::MalformedAnnouncement {
                sequence_index: reported,
                reason,
            } => Self {
                sequence_index: reported.or(sequence_index),
                reason: reason.clone(),
            },
            other => Self {
                sequence_index,
                reason: other.to_string(),
            },
        }
    }
}

/// Why a scan stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanCompletion {
    /// Every record was consumed
    Exhausted,
    /// The cancel flag was raised
    Cancelled,
    /// `max_records` records were processed
    RecordLimit,
    /// The deadline passed
    Deadline,
    /// `stop_on_first` was set and a match was found
    FirstMatch,
}

impl ScanCompletion {
    /// Returns true if the scan stopped before the input ran out.
    pub fn is_partial(&self) -> bool {
        !matches!(self, ScanCompletion::Exhausted)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared cancellation flag, cloned into whoever needs to stop a scan.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unraised flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect before the next record.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lowers the flag so the next scan runs. Every clone sees the change.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cooperative stop conditions, checked before each record.
#[derive(Clone, Debug, Default)]
pub struct ScanControl {
    cancel: CancelFlag,
    max_records: Option<u64>,
    deadline: Option<Instant>,
    stop_on_first: bool,
}

impl ScanControl {
    /// No limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing cancel flag.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Stops after `max` records have been processed.
    pub fn with_max_records(mut self, max: u64) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Stops once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stops once `timeout` has elapsed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Stops after the first match.
    pub fn stop_on_first(mut self, stop: bool) -> Self {
        self.stop_on_first = stop;
        self
    }

    /// The flag that cancels this scan.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Record cap, if any.
    pub fn max_records(&self) -> Option<u64> {
        self.max_records
    }

    /// Returns the reason to stop before processing the next record, if any.
    pub fn check(&self, processed: u64) -> Option<ScanCompletion> {
        if self.cancel.is_cancelled() {
            return Some(ScanCompletion::Cancelled);
        }
        if matches!(self.max_records, Some(max) if processed >= max) {
            return Some(ScanCompletion::RecordLimit);
        }
        if matches!(self.deadline, Some(deadline) if Instant::now() >= deadline) {
            return Some(ScanCompletion::Deadline);
        }
        None
    }
}

/// Opaque resumption token: the next sequence index to scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanCheckpoint {
    next_index: u64,
}

impl ScanCheckpoint {
    /// Starts from the beginning of the log.
    pub fn start() -> Self {
        Self::default()
    }

    /// Resumes at `next_index`.
    pub fn at(next_index: u64) -> Self {
        Self { next_index }
    }

    /// The next sequence index a scan should read.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Marks `sequence_index` as scanned.
    pub fn advance_past(&mut self, sequence_index: u64) {
        self.next_index = self.next_index.max(sequence_index.saturating_add(1));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Statistics for scanning operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Total announcements processed
    pub total_scanned: u64,
    /// Number of view tag matches
    pub view_tag_matches: u64,
    /// View tag matches whose address differed
    pub collisions: u64,
    /// Payments discovered with spending keys
    pub owned: u64,
    /// Payments discovered view-only
    pub detected: u64,
    /// Records skipped as malformed
    pub malformed: u64,
    /// Records below the resume checkpoint
    pub skipped: u64,
    /// Duration of the scan in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scan outcome.
    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.total_scanned += 1;
        match outcome {
            RecordOutcome::NotOurs => {}
            RecordOutcome::ViewTagCollision => {
                self.view_tag_matches += 1;
                self.collisions += 1;
            }
            RecordOutcome::Owned(_) => {
                self.view_tag_matches += 1;
                self.owned += 1;
            }
            RecordOutcome::Detected(_) => {
                self.view_tag_matches += 1;
                self.detected += 1;
            }
            RecordOutcome::Malformed(_) => {
                self.malformed += 1;
            }
        }
    }

    /// Adds another scan's counters to this one.
    pub fn merge(&mut self, other: &ScanStats) {
        self.total_scanned += other.total_scanned;
        self.view_tag_matches += other.view_tag_matches;
        self.collisions += other.collisions;
        self.owned += other.owned;
        self.detected += other.detected;
        self.malformed += other.malformed;
        self.skipped += other.skipped;
        self.duration_ms = self.duration_ms.max(other.duration_ms);
    }

    /// Payments found, owned or detected.
    pub fn discoveries(&self) -> u64 {
        self.owned + self.detected
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total_scanned as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Returns the filter efficiency (percentage of announcements filtered).
    pub fn filter_efficiency(&self) -> f64 {
        let valid = self.total_scanned - self.malformed;
        if valid == 0 {
            0.0
        } else {
            ((valid - self.view_tag_matches) as f64 / valid as f64) * 100.0
        }
    }

    /// Fraction of valid records that were view tag collisions.
    pub fn false_positive_rate(&self) -> f64 {
        let valid = self.total_scanned - self.malformed;
        if valid == 0 {
            0.0
        } else {
            self.collisions as f64 / valid as f64
        }
    }
}

/// Everything a scan produced.
#[derive(Debug)]
pub struct ScanReport {
    /// Owned addresses, in log order
    pub owned: Vec<OwnedStealthAddress>,
    /// View-only matches, in log order
    pub detected: Vec<DetectedStealthAddress>,
    /// Skipped records
    pub anomalies: Vec<ScanAnomaly>,
    /// Counters
    pub stats: ScanStats,
    /// Where to resume
    pub checkpoint: ScanCheckpoint,
    /// Why the scan stopped
    pub completion: ScanCompletion,
}

impl ScanReport {
    /// Creates an empty report that resumes at `checkpoint`.
    pub fn empty(checkpoint: ScanCheckpoint) -> Self {
        Self {
            owned: Vec::new(),
            detected: Vec::new(),
            anomalies: Vec::new(),
            stats: ScanStats::new(),
            checkpoint,
            completion: ScanCompletion::Exhausted,
        }
    }

    /// Appends a later report covering records after this one's.
    ///
    /// The first partial completion wins.
    pub fn extend(&mut self, later: ScanReport) {
        self.owned.extend(later.owned);
        self.detected.extend(later.detected);
        self.anomalies.extend(later.anomalies);
        self.stats.merge(&later.stats);
        self.checkpoint = self.checkpoint.max(later.checkpoint);
        if !self.completion.is_partial() {
            self.completion = later.completion;
        }
    }

    /// Number of payments found.
    pub fn match_count(&self) -> usize {
        self.owned.len() + self.detected.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORD INPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Anything a scanner can read a record from.
///
/// Implemented for plain records and for the `Result` items an
/// [`wraith_core::traits::AnnouncementStream`] yields, so both feed the same
/// scan loop without cloning.
pub trait AsRecord {
    /// Borrows the record, or the error that replaced it.
    fn as_record(&self) -> std::result::Result<&AnnouncedStealth, &StealthError>;
}

impl AsRecord for AnnouncedStealth {
    fn as_record(&self) -> std::result::Result<&AnnouncedStealth, &StealthError> {
        Ok(self)
    }
}

impl AsRecord for Result<AnnouncedStealth> {
    fn as_record(&self) -> std::result::Result<&AnnouncedStealth, &StealthError> {
        self.as_ref()
    }
}

impl<T: AsRecord + ?Sized> AsRecord for &T {
    fn as_record(&self) -> std::result::Result<&AnnouncedStealth, &StealthError> {
        (**self).as_record()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

struct ScalarGuard(NonZeroScalar);

impl Drop for ScalarGuard {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Recipient-side scanner holding parsed keys.
///
/// Keys are validated once at construction; the scanner is `Send + Sync`
/// and can be shared across threads behind an `Arc`.
pub struct PaymentScanner<E = EthereumAddressEncoder> {
    viewing_sk: ScalarGuard,
    spending_pk: PublicKey,
    spending_sk: Option<ScalarGuard>,
    encoder: E,
}

impl PaymentScanner<EthereumAddressEncoder> {
    /// Creates a full scanner for Ethereum addresses.
    ///
    /// # Errors
    /// `InvalidPrivateKey` if a scalar is out of range or the spending key
    /// does not match `spending_pk`; `InvalidPublicKey` if `spending_pk` is
    /// not on the curve.
    pub fn new(
        viewing_sk: &CurveSecretKey,
        spending_pk: &CurvePublicKey,
        spending_sk: &CurveSecretKey,
    ) -> Result<Self> {
        Self::with_encoder(viewing_sk, spending_pk, spending_sk, EthereumAddressEncoder)
    }

    /// Creates a full scanner from a recipient key set.
    pub fn from_keys(keys: &StealthKeyPair) -> Result<Self> {
        Self::new(
            keys.viewing_private_key(),
            keys.spending_public_key(),
            keys.spending_private_key(),
        )
    }

    /// Creates a view-only scanner that detects but cannot spend.
    pub fn view_only(viewing_key: &ViewingKey) -> Result<Self> {
        Self::view_only_with_encoder(viewing_key, EthereumAddressEncoder)
    }
}

impl<E: AddressEncoder> PaymentScanner<E> {
    /// Creates a full scanner with a custom address encoder.
    pub fn with_encoder(
        viewing_sk: &CurveSecretKey,
        spending_pk: &CurvePublicKey,
        spending_sk: &CurveSecretKey,
        encoder: E,
    ) -> Result<Self> {
        let viewing = ScalarGuard(parse_secret_key(viewing_sk)?);
        let spending_pk = parse_public_key(spending_pk)?;
        let spending = ScalarGuard(parse_secret_key(spending_sk)?);

        if public_key_for(&spending.0) != spending_pk {
            return Err(StealthError::InvalidPrivateKey(
                "spending private key does not match spending public key".into(),
            ));
        }

        Ok(Self {
            viewing_sk: viewing,
            spending_pk,
            spending_sk: Some(spending),
            encoder,
        })
    }

    /// Creates a view-only scanner with a custom address encoder.
    pub fn view_only_with_encoder(viewing_key: &ViewingKey, encoder: E) -> Result<Self> {
        Ok(Self {
            viewing_sk: ScalarGuard(parse_secret_key(viewing_key.viewing_private_key())?),
            spending_pk: parse_public_key(viewing_key.spending_public_key())?,
            spending_sk: None,
            encoder,
        })
    }

    /// Returns true if this scanner cannot derive spending keys.
    pub fn is_view_only(&self) -> bool {
        self.spending_sk.is_none()
    }

    /// Scans one announcement.
    pub fn scan_record(&self, record: &AnnouncedStealth) -> RecordOutcome {
        let index = Some(record.sequence_index);
        let malformed = |e: &StealthError| RecordOutcome::Malformed(ScanAnomaly::from_error(index, e));

        if let Err(e) = record.validate() {
            return malformed(&e);
        }
        let ephemeral = match parse_public_key(record.ephemeral_public_key()) {
            Ok(point) => point,
            Err(e) => return malformed(&e),
        };

        let secret = shared_secret(&self.viewing_sk.0, &ephemeral);
        if !verify_view_tag(&secret, record.view_tag()) {
            return RecordOutcome::NotOurs;
        }

        let candidate = match derive_stealth_address(&self.spending_pk, &secret, &self.encoder) {
            Ok((_, address)) => address,
            Err(e) => return malformed(&e),
        };
        if !addresses_match(&candidate, &record.stealth_address) {
            debug!(sequence_index = record.sequence_index, "view tag collision");
            return RecordOutcome::ViewTagCollision;
        }

        let Some(spending_sk) = &self.spending_sk else {
            return RecordOutcome::Detected(DetectedStealthAddress::new(candidate, record.clone()));
        };

        match derive_stealth_private_key(&spending_sk.0, &secret) {
            Ok(mut stealth_sk) => {
                let key = encode_secret_key(&stealth_sk);
                stealth_sk.zeroize();
                RecordOutcome::Owned(OwnedStealthAddress::new(candidate, key, record.clone()))
            }
            Err(e) => malformed(&e),
        }
    }

    /// Scans records from the start of the input.
    pub fn scan<I>(&self, records: I, control: &ScanControl) -> Result<ScanReport>
    where
        I: IntoIterator,
        I::Item: AsRecord,
    {
        self.scan_from(records, ScanCheckpoint::start(), control)
    }

    /// Scans records, skipping those below `resume`.
    ///
    /// # Errors
    /// Only a non-record error yielded by the input (a failed log backend)
    /// aborts the scan; malformed records become anomalies.
    pub fn scan_from<I>(
        &self,
        records: I,
        resume: ScanCheckpoint,
        control: &ScanControl,
    ) -> Result<ScanReport>
    where
        I: IntoIterator,
        I::Item: AsRecord,
    {
        let mut session = self.session(resume, control);
        for item in records {
            if let ControlFlow::Break(completion) = session.feed(&item)? {
                return Ok(session.finish(completion));
            }
        }
        Ok(session.finish(ScanCompletion::Exhausted))
    }

    /// Starts an incremental scan fed one record at a time.
    pub fn session<'a>(&'a self, resume: ScanCheckpoint, control: &'a ScanControl) -> ScanSession<'a, E> {
        ScanSession::new(self, resume, control)
    }
}

impl<E> std::fmt::Debug for PaymentScanner<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentScanner")
            .field("viewing_sk", &"[REDACTED]")
            .field("spending_pk", &self.spending_pk)
            .field("view_only", &self.spending_sk.is_none())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// An in-progress scan.
///
/// Drives both the synchronous [`PaymentScanner::scan_from`] and async
/// stream consumers, which feed records as they arrive.
pub struct ScanSession<'a, E> {
    scanner: &'a PaymentScanner<E>,
    control: &'a ScanControl,
    resume_from: u64,
    report: ScanReport,
    started: Instant,
}

impl<'a, E: AddressEncoder> ScanSession<'a, E> {
    fn new(scanner: &'a PaymentScanner<E>, resume: ScanCheckpoint, control: &'a ScanControl) -> Self {
        Self {
            scanner,
            control,
            resume_from: resume.next_index(),
            report: ScanReport::empty(resume),
            started: Instant::now(),
        }
    }

    /// Processes one item. `Break` means the scan must stop.
    pub fn feed<T: AsRecord>(&mut self, item: T) -> Result<ControlFlow<ScanCompletion>> {
        if let Some(completion) = self.control.check(self.report.stats.total_scanned) {
            return Ok(ControlFlow::Break(completion));
        }

        let record = match item.as_record() {
            Ok(record) => record,
            Err(e) if e.is_per_record() => {
                let anomaly = ScanAnomaly::from_error(None, e);
                if let Some(index) = anomaly.sequence_index {
                    if index < self.resume_from {
                        self.report.stats.skipped += 1;
                        return Ok(ControlFlow::Continue(()));
                    }
                    self.report.checkpoint.advance_past(index);
                }
                self.push(RecordOutcome::Malformed(anomaly));
                return Ok(ControlFlow::Continue(()));
            }
            Err(e) => return Err(StealthError::LogError(e.to_string())),
        };

        if record.sequence_index < self.resume_from {
            self.report.stats.skipped += 1;
            return Ok(ControlFlow::Continue(()));
        }

        let outcome = self.scanner.scan_record(record);
        let matched = outcome.is_match();
        self.report.checkpoint.advance_past(record.sequence_index);
        self.push(outcome);

        if matched && self.control.stop_on_first {
            return Ok(ControlFlow::Break(ScanCompletion::FirstMatch));
        }
        Ok(ControlFlow::Continue(()))
    }

    fn push(&mut self, outcome: RecordOutcome) {
        self.report.stats.record(&outcome);
        match outcome {
            RecordOutcome::Owned(owned) => {
                debug!(sequence_index = owned.sequence_index(), "payment discovered");
                self.report.owned.push(owned);
            }
            RecordOutcome::Detected(detected) => {
                debug!(sequence_index = detected.sequence_index(), "payment detected");
                self.report.detected.push(detected);
            }
            RecordOutcome::Malformed(anomaly) => {
                warn!(
                    sequence_index = ?anomaly.sequence_index,
                    reason = %anomaly.reason,
                    "skipping malformed announcement"
                );
                self.report.anomalies.push(anomaly);
            }
            RecordOutcome::NotOurs | RecordOutcome::ViewTagCollision => {}
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> &ScanStats {
        &self.report.stats
    }

    /// Ends the scan.
    pub fn finish(mut self, completion: ScanCompletion) -> ScanReport {
        self.report.stats.duration_ms = self.started.elapsed().as_millis() as u64;
        self.report.completion = completion;

        let stats = &self.report.stats;
        info!(
            scanned = stats.total_scanned,
            view_tag_matches = stats.view_tag_matches,
            owned = stats.owned,
            detected = stats.detected,
            malformed = stats.malformed,
            next_index = self.report.checkpoint.next_index(),
            completion = ?completion,
            "scan finished"
        );
        self.report
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Finds every announcement paying this recipient, with spending keys.
///
/// Key validation fails fast; malformed records are skipped.
pub fn check_stealth_payments<I>(
    viewing_sk: &CurveSecretKey,
    spending_pk: &CurvePublicKey,
    spending_sk: &CurveSecretKey,
    records: I,
    control: &ScanControl,
) -> Result<ScanReport>
where
    I: IntoIterator,
    I::Item: AsRecord,
{
    PaymentScanner::new(viewing_sk, spending_pk, spending_sk)?.scan(records, control)
}

/// View-only variant: finds payments without deriving spending keys.
pub fn detect_stealth_payments<I>(
    viewing_key: &ViewingKey,
    records: I,
    control: &ScanControl,
) -> Result<ScanReport>
where
    I: IntoIterator,
    I::Item: AsRecord,
{
    PaymentScanner::view_only(viewing_key)?.scan(records, control)
}
