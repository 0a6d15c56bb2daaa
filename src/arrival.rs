//! Poisson arrival model for block discovery

use crate::hashrate_dist::HashrateShare;

/// Mean time between blocks assumed by [`ArrivalModel::default`], in seconds.
pub const DEFAULT_BLOCK_INTERVAL_SECS: f64 = 600.0;

/// CDF of the exponential distribution: the probability that an event
/// occurring at the given rate happens within `duration`.
///
/// `rate` and `duration` must both be non-negative; this is a precondition
/// on callers, not a recoverable error. The result lies in `[0, 1)`.
pub fn exponential_cdf(rate: f64, duration: f64) -> f64 {
    debug_assert!(rate >= 0.0, "negative rate {}", rate);
    debug_assert!(duration >= 0.0, "negative duration {}", duration);

    1.0 - (-rate * duration).exp()
}

/// Block discovery modeled as a Poisson process over the whole network.
///
/// The rate λ is the expected number of blocks found per second by all
/// participants combined. A participant controlling share `h` of the network
/// hashrate contributes a thinned process of rate `λ·h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalModel {
    rate: f64,
}

impl ArrivalModel {
    /// Creates a model with the given network-wide block rate, in blocks per
    /// second.
    ///
    /// # Panics
    /// Panics if `rate` is negative or not finite.
    pub fn new(rate: f64) -> Self {
        assert!(rate.is_finite() && rate >= 0.0, "invalid block rate {}", rate);

        ArrivalModel { rate }
    }

    /// Creates a model from the mean time between blocks, in seconds.
    ///
    /// # Panics
    /// Panics if `mean_secs` is not strictly positive.
    pub fn from_block_interval(mean_secs: f64) -> Self {
        assert!(
            mean_secs > 0.0,
            "block interval must be positive, got {}",
            mean_secs
        );

        Self::new(mean_secs.recip())
    }

    /// Network-wide block rate, in blocks per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Probability that a participant with hashrate share `share` finds a
    /// block within `duration` seconds of a reference instant.
    ///
    /// Monotonically non-decreasing in both arguments; `0.0` at zero
    /// duration, approaching `1.0` as `duration` grows.
    pub fn finds_within(&self, duration: f64, share: HashrateShare) -> f64 {
        exponential_cdf(self.rate * share, duration)
    }
}

impl Default for ArrivalModel {
    /// Model with the 600-second mean block interval of the Bitcoin network.
    fn default() -> Self {
        Self::from_block_interval(DEFAULT_BLOCK_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::{exponential_cdf, ArrivalModel};

    #[test]
    fn cdf_is_zero_at_zero_duration() {
        assert_eq!(exponential_cdf(1.0 / 600.0, 0.0), 0.0);
        assert_eq!(exponential_cdf(0.0, 1_000.0), 0.0);
    }

    #[test]
    fn finds_within_stays_in_unit_interval() {
        let model = ArrivalModel::default();

        for share in [0.01, 0.3, 0.5, 0.99] {
            for duration in [0.0, 1.0, 60.0, 600.0, 6_000.0] {
                let p = model.finds_within(duration, share);
                assert!((0.0..1.0).contains(&p), "p = {} out of range", p);
            }
        }
    }

    #[test]
    fn finds_within_monotone_in_duration() {
        let model = ArrivalModel::default();

        let mut last = 0.0;
        for duration in (0..100).map(|t| t as f64 * 30.0) {
            let p = model.finds_within(duration, 0.25);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn finds_within_monotone_in_share() {
        let model = ArrivalModel::default();

        let mut last = 0.0;
        for share in (1..=100).map(|h| h as f64 / 100.0) {
            let p = model.finds_within(120.0, share);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn default_matches_600s_interval() {
        assert_eq!(ArrivalModel::default().rate(), 1.0 / 600.0);
        assert_eq!(ArrivalModel::from_block_interval(600.0).rate(), 1.0 / 600.0);
    }
}
