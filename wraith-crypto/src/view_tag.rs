//! View tag computation for efficient scanning.
//!
//! View tags enable recipients to quickly filter announcements:
//! - Each announcement includes a 1-byte view tag
//! - Recipients compute their expected view tag from the shared secret
//! - Only announcements with matching view tags require point arithmetic
//!
//! ## Efficiency
//!
//! With 1-byte view tags (256 possible values), ~99.6% of announcements
//! can be skipped after a single ECDH.
//!
//! ## Security
//!
//! View tags leak 1 byte of the shared-secret scalar, leaving 248 bits.
//! The tag alone cannot identify the recipient.

use subtle::ConstantTimeEq;

use wraith_core::constants::VIEW_TAG_SPACE;

use crate::curve::SharedSecret;

/// Computes the view tag from a shared secret.
///
/// The view tag is the first byte of the big-endian shared scalar.
///
/// # Example
///
/// ```rust,ignore
/// use wraith_crypto::{compute_view_tag, shared_secret};
///
/// let s = shared_secret(&ephemeral_sk, &viewing_pk);
/// let view_tag = compute_view_tag(&s);
/// ```
pub fn compute_view_tag(secret: &SharedSecret) -> u8 {
    secret.view_tag()
}

/// Checks if a view tag matches the expected value for a shared secret.
///
/// This is a constant-time comparison to prevent timing attacks.
pub fn verify_view_tag(secret: &SharedSecret, expected_tag: u8) -> bool {
    compute_view_tag(secret).ct_eq(&expected_tag).into()
}

/// χ² critical value for 255 degrees of freedom at p = 0.001.
const UNIFORMITY_CRITICAL_VALUE: f64 = 330.5;

/// Below this many samples per tag the χ² approximation is unreliable.
const MIN_SAMPLES_PER_TAG: u64 = 5;

/// Histogram of the view tags published in a log.
///
/// Honest senders produce uniformly distributed tags, so a skewed log is
/// a sign of a broken or malicious sender. The histogram also tells a
/// scanner how many view tag collisions to expect.
#[derive(Clone, Debug)]
pub struct ViewTagHistogram {
    counts: [u64; VIEW_TAG_SPACE],
    total: u64,
}

impl Default for ViewTagHistogram {
    fn default() -> Self {
        Self {
            counts: [0; VIEW_TAG_SPACE],
            total: 0,
        }
    }
}

impl ViewTagHistogram {
    /// Creates an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a histogram from per-tag counts, such as
    /// `AnnouncementStats::view_tag_distribution`. Entries past tag 255 are
    /// ignored.
    pub fn from_counts(counts: &[u64]) -> Self {
        let mut histogram = Self::new();
        for (slot, &count) in histogram.counts.iter_mut().zip(counts) {
            *slot = count;
            histogram.total += count;
        }
        histogram
    }

    /// Counts one tag.
    pub fn record(&mut self, tag: u8) {
        self.counts[usize::from(tag)] += 1;
        self.total += 1;
    }

    /// Number of tags counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Occurrences of `tag`.
    pub fn count(&self, tag: u8) -> u64 {
        self.counts[usize::from(tag)]
    }

    /// The most frequent tag and its count; the lowest tag wins ties.
    pub fn busiest(&self) -> Option<(u8, u64)> {
        if self.total == 0 {
            return None;
        }
        let mut best = (0u8, self.counts[0]);
        for (tag, &count) in (0u8..=u8::MAX).zip(self.counts.iter()) {
            if count > best.1 {
                best = (tag, count);
            }
        }
        Some(best)
    }

    /// Collisions an unrelated recipient should expect when scanning these
    /// records: one in every 256.
    pub fn expected_collisions(&self) -> f64 {
        self.total as f64 / VIEW_TAG_SPACE as f64
    }

    /// Pearson χ² statistic against the uniform distribution.
    pub fn chi_squared(&self) -> f64 {
        let expected = self.expected_collisions();
        if expected == 0.0 {
            return 0.0;
        }
        self.counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum()
    }

    /// Whether the tags are consistent with a uniform distribution.
    ///
    /// `None` until there are enough samples for the test to mean anything.
    pub fn is_uniform(&self) -> Option<bool> {
        if self.total < MIN_SAMPLES_PER_TAG * VIEW_TAG_SPACE as u64 {
            return None;
        }
        Some(self.chi_squared() <= UNIFORMITY_CRITICAL_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{public_key_for, random_scalar, shared_secret};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn random_secret(rng: &mut ChaCha20Rng) -> SharedSecret {
        let a = random_scalar(rng).unwrap();
        let b = random_scalar(rng).unwrap();
        shared_secret(&a, &public_key_for(&b))
    }

    #[test]
    fn test_view_tag_deterministic() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let a = random_scalar(&mut rng).unwrap();
        let b = public_key_for(&random_scalar(&mut rng).unwrap());

        let tag1 = compute_view_tag(&shared_secret(&a, &b));
        let tag2 = compute_view_tag(&shared_secret(&a, &b));
        assert_eq!(tag1, tag2);
    }

    #[test]
    fn test_verify_view_tag() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let secret = random_secret(&mut rng);
        let correct_tag = compute_view_tag(&secret);
        let wrong_tag = correct_tag.wrapping_add(1);

        assert!(verify_view_tag(&secret, correct_tag));
        assert!(!verify_view_tag(&secret, wrong_tag));
    }

    #[test]
    fn test_view_tags_are_uniform() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut histogram = ViewTagHistogram::new();

        for _ in 0..5000 {
            histogram.record(compute_view_tag(&random_secret(&mut rng)));
        }

        assert_eq!(histogram.total(), 5000);
        assert!(histogram.chi_squared() < 500.0, "χ² = {}", histogram.chi_squared());
        // 5000 samples is below the 5-per-tag threshold.
        assert_eq!(histogram.is_uniform(), None);
    }

    #[test]
    fn test_histogram_counts() {
        let mut histogram = ViewTagHistogram::new();
        assert_eq!(histogram.busiest(), None);

        for tag in [0, 0, 1, 255] {
            histogram.record(tag);
        }

        assert_eq!(histogram.total(), 4);
        assert_eq!(histogram.count(0), 2);
        assert_eq!(histogram.count(255), 1);
        assert_eq!(histogram.busiest(), Some((0, 2)));
    }

    #[test]
    fn test_histogram_from_counts() {
        let mut counts = vec![0u64; VIEW_TAG_SPACE + 3];
        counts[3] = 5;
        counts[200] = 7;
        counts[VIEW_TAG_SPACE] = 99;

        let histogram = ViewTagHistogram::from_counts(&counts);
        assert_eq!(histogram.total(), 12);
        assert_eq!(histogram.busiest(), Some((200, 7)));
    }

    #[test]
    fn test_uniformity_verdict() {
        let flat = ViewTagHistogram::from_counts(&[10; VIEW_TAG_SPACE]);
        assert_eq!(flat.chi_squared(), 0.0);
        assert_eq!(flat.is_uniform(), Some(true));
        assert!((flat.expected_collisions() - 10.0).abs() < 1e-9);

        let mut skewed = [5u64; VIEW_TAG_SPACE];
        skewed[0x42] = 2000;
        assert_eq!(ViewTagHistogram::from_counts(&skewed).is_uniform(), Some(false));
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = ViewTagHistogram::new();
        assert_eq!(histogram.chi_squared(), 0.0);
        assert_eq!(histogram.is_uniform(), None);
    }
}
