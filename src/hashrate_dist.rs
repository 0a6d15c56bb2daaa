//! Describing distributions of network hashrate between mining pools

/// Numeric type used to represent a fraction of the network hashrate.
pub type HashrateShare = f64;

/// An ordered mapping from pool name to that pool's fraction of the total
/// network hashrate.
///
/// Validated once at construction: at least one pool, each share in
/// `(0.0, 1.0]`, unique names, and shares summing to `1.0` within
/// [`EPSILON_SHARE`](Self::EPSILON_SHARE). A distribution is immutable for
/// the lifetime of a computation run.
#[derive(Debug, Clone, PartialEq)]
pub struct HashrateDistribution {
    pools: Vec<(String, HashrateShare)>,
}

#[derive(Debug, thiserror::Error)]
pub enum HashrateDistributionError {
    #[error("no pools given")]
    NoPoolsGiven,
    #[error("pool {0} has hashrate share {1}, not in the range (0.0, 1.0]")]
    BadShare(String, HashrateShare),
    #[error("pool {0} appears more than once")]
    DuplicatePool(String),
    #[error("hashrate shares sum to {0}, not 1.0")]
    BadShareSum(HashrateShare),
}

impl HashrateDistribution {
    /// Allowable difference between a share sum and 1.0.
    pub const EPSILON_SHARE: HashrateShare = 1e-9;

    /// Creates a distribution from `(name, share)` pairs, preserving their
    /// order.
    pub fn new<I, S>(pools: I) -> Result<Self, HashrateDistributionError>
    where
        I: IntoIterator<Item = (S, HashrateShare)>,
        S: Into<String>,
    {
        use HashrateDistributionError::*;

        let pools: Vec<(String, HashrateShare)> = pools
            .into_iter()
            .map(|(name, share)| (name.into(), share))
            .collect();

        if pools.is_empty() {
            return Err(NoPoolsGiven);
        }

        for (i, (name, share)) in pools.iter().enumerate() {
            if share.is_nan() || *share <= 0.0 || *share > 1.0 {
                return Err(BadShare(name.clone(), *share));
            }
            if pools[..i].iter().any(|(seen, _)| seen == name) {
                return Err(DuplicatePool(name.clone()));
            }
        }

        let sum: HashrateShare = pools.iter().map(|(_, share)| share).sum();
        if HashrateShare::abs(sum - 1.0) > Self::EPSILON_SHARE {
            return Err(BadShareSum(sum));
        }

        Ok(HashrateDistribution { pools })
    }

    /// The ten-pool network snapshot used as a default: seven major pools
    /// covering most of the hashrate, plus three invented smaller pools for
    /// the remainder.
    pub fn default_pools() -> Self {
        Self::new([
            ("ANTPOOL", 0.30),
            ("FOUNDRY", 0.29),
            ("VIABTC", 0.12),
            ("F2POOL", 0.11),
            ("SPIDER", 0.08),
            ("MARA", 0.05),
            ("SECPOOL", 0.03),
            ("SMALL", 0.012),
            ("VERYSMALL", 0.006),
            ("TINY", 0.002),
        ])
        .expect("default pool distribution is valid")
    }

    /// Returns the share of the named pool, if present.
    pub fn share_of(&self, name: &str) -> Option<HashrateShare> {
        self.pools
            .iter()
            .find(|(pool, _)| pool == name)
            .map(|(_, share)| *share)
    }

    /// Iterates over `(name, share)` pairs in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, HashrateShare)> + '_ {
        self.pools.iter().map(|(name, share)| (name.as_str(), *share))
    }

    /// Iterates over pool names in construction order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.pools.iter().map(|(name, _)| name.as_str())
    }

    /// Iterates over every pool other than `name`, in construction order.
    ///
    /// Pools are compared by name only: a share tie between two pools never
    /// conflates them or drops a competitor from the set.
    pub fn others<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a str, HashrateShare)> + 'a {
        self.pools
            .iter()
            .filter(move |(pool, _)| pool != name)
            .map(|(pool, share)| (pool.as_str(), *share))
    }

    /// Number of pools in the distribution.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Always false for a validated distribution; present for completeness.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
