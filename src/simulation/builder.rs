use std::time::Duration;

use crate::{
    arrival::DEFAULT_BLOCK_INTERVAL_SECS,
    hashrate_dist::{
        HashrateDistribution, HashrateDistributionError, HashrateShare,
    },
    strategy::{Honest, Strategy},
};

use super::{MinerId, SimBlock, SimMiner, Simulation};

/// Builds a [`Simulation`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stale_sim::prelude::*;
///
/// let sim = SimulationBuilder::new()
///     .pools(&HashrateDistribution::default_pools())
///     .propagation(Duration::from_secs(10))
///     .blocks(1_000)
///     .seed(1)
///     .build()
///     .unwrap();
///
/// let results = sim.run_all().unwrap().all().build();
/// println!("{}", results);
/// ```
#[derive(Debug, Default)]
pub struct SimulationBuilder {
    blocks: Option<usize>,
    repeat_all: Option<usize>,
    block_interval: Option<Duration>,
    propagation: Option<Duration>,
    pools: Vec<PoolSpec>,
    delays: Vec<(String, Duration)>,
    seed: Option<u64>,
}

#[derive(Debug)]
struct PoolSpec {
    name: String,
    share: HashrateShare,
    strategy: Box<dyn Strategy>,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationBuildError {
    #[error("no pools were added")]
    NoPoolsGiven,
    #[error("number of blocks to simulate must be greater than 0")]
    ZeroBlocks,
    #[error("cannot run a simulation 0 times")]
    ZeroRepeats,
    #[error("mean block interval must be greater than 0")]
    ZeroBlockInterval,
    #[error("no pool named {0} to set a propagation delay for")]
    UnknownPool(String),
    #[error(transparent)]
    HashrateDistributionError(#[from] HashrateDistributionError),
}

impl SimulationBuilder {
    /// Creates a new [`SimulationBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks to find before the simulation winds down
    /// (default 1).
    pub fn blocks(mut self, blocks: usize) -> Self {
        self.blocks = Some(blocks);

        self
    }

    /// The simulation will run `repeats` times (default 1).
    pub fn repeat_all(mut self, repeats: usize) -> Self {
        self.repeat_all = Some(repeats);

        self
    }

    /// Mean time between blocks across the whole network (default 600
    /// seconds).
    pub fn block_interval(mut self, interval: Duration) -> Self {
        self.block_interval = Some(interval);

        self
    }

    /// Propagation delay of every pool without a
    /// [`delay_for`](Self::delay_for) override (default 0).
    pub fn propagation(mut self, delay: Duration) -> Self {
        self.propagation = Some(delay);

        self
    }

    /// Overrides the propagation delay of the named pool. The last override
    /// for a name wins.
    pub fn delay_for<N>(mut self, name: N, delay: Duration) -> Self
    where
        N: Into<String>,
    {
        self.delays.push((name.into(), delay));

        self
    }

    /// Adds every pool of `distribution`, all mining honestly.
    pub fn pools(mut self, distribution: &HashrateDistribution) -> Self {
        for (name, share) in distribution.iter() {
            self = self.add_pool(name, share);
        }

        self
    }

    /// Adds an honestly mining pool.
    pub fn add_pool<N>(self, name: N, share: HashrateShare) -> Self
    where
        N: Into<String>,
    {
        self.add_pool_with(name, share, Honest::new())
    }

    /// Adds a pool following the given strategy.
    pub fn add_pool_with<N, S>(
        mut self,
        name: N,
        share: HashrateShare,
        strategy: S,
    ) -> Self
    where
        N: Into<String>,
        S: Strategy + 'static,
    {
        self.pools.push(PoolSpec {
            name: name.into(),
            share,
            strategy: Box::new(strategy),
        });

        self
    }

    /// Seeds the random number generator, making runs reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);

        self
    }

    /// Creates a [`Simulation`] from the specified parameters.
    pub fn build(self) -> Result<Simulation, SimulationBuildError> {
        use SimulationBuildError::*;

        let SimulationBuilder {
            blocks,
            repeat_all,
            block_interval,
            propagation,
            pools,
            delays,
            seed,
        } = self;

        if pools.is_empty() {
            return Err(NoPoolsGiven);
        }

        let blocks = match blocks {
            Some(0) => return Err(ZeroBlocks),
            Some(count) => count,
            None => 1,
        };
        let repeat_all = match repeat_all {
            Some(0) => return Err(ZeroRepeats),
            Some(repeats) => repeats,
            None => 1,
        };
        let block_interval = match block_interval {
            Some(interval) if interval.is_zero() => {
                return Err(ZeroBlockInterval)
            }
            Some(interval) => interval,
            None => Duration::from_secs_f64(DEFAULT_BLOCK_INTERVAL_SECS),
        };
        let propagation = propagation.unwrap_or(Duration::ZERO);

        // Share validation (range, duplicates, sum) is the distribution's.
        HashrateDistribution::new(
            pools.iter().map(|pool| (pool.name.clone(), pool.share)),
        )?;

        for (name, _) in delays.iter() {
            if !pools.iter().any(|pool| &pool.name == name) {
                return Err(UnknownPool(name.clone()));
            }
        }

        let miners = pools
            .into_iter()
            .enumerate()
            .map(|(index, pool)| {
                let delay = delays
                    .iter()
                    .rev()
                    .find(|(name, _)| name == &pool.name)
                    .map_or(propagation, |(_, delay)| *delay);

                SimMiner {
                    id: MinerId(index),
                    name: pool.name,
                    share: pool.share,
                    propagation: delay,
                    strategy: pool.strategy,
                    chain: vec![SimBlock::GENESIS],
                    found: 0,
                    stale: 0,
                }
            })
            .collect();

        Ok(Simulation {
            miners,
            blocks,
            repeat_all,
            block_interval,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_build() {
        SimulationBuilder::new()
            .add_pool("solo", 1.0)
            .build()
            .expect("valid simulation build");
    }

    #[test]
    fn rejects_missing_pools() {
        assert!(matches!(
            SimulationBuilder::new().build(),
            Err(SimulationBuildError::NoPoolsGiven)
        ));
    }

    #[test]
    fn rejects_zero_parameters() {
        assert!(matches!(
            SimulationBuilder::new().add_pool("solo", 1.0).blocks(0).build(),
            Err(SimulationBuildError::ZeroBlocks)
        ));
        assert!(matches!(
            SimulationBuilder::new()
                .add_pool("solo", 1.0)
                .repeat_all(0)
                .build(),
            Err(SimulationBuildError::ZeroRepeats)
        ));
        assert!(matches!(
            SimulationBuilder::new()
                .add_pool("solo", 1.0)
                .block_interval(Duration::ZERO)
                .build(),
            Err(SimulationBuildError::ZeroBlockInterval)
        ));
    }

    #[test]
    fn rejects_invalid_shares() {
        assert!(matches!(
            SimulationBuilder::new().add_pool("half", 0.5).build(),
            Err(SimulationBuildError::HashrateDistributionError(_))
        ));
        assert!(matches!(
            SimulationBuilder::new()
                .add_pool("twin", 0.5)
                .add_pool("twin", 0.5)
                .build(),
            Err(SimulationBuildError::HashrateDistributionError(_))
        ));
    }

    #[test]
    fn rejects_delay_overrides_for_unknown_pools() {
        assert!(matches!(
            SimulationBuilder::new()
                .add_pool("solo", 1.0)
                .delay_for("nonesuch", Duration::from_secs(1))
                .build(),
            Err(SimulationBuildError::UnknownPool(_))
        ));
    }

    #[test]
    fn delay_overrides_apply_to_named_pools_only() {
        let sim = SimulationBuilder::new()
            .add_pool("near", 0.5)
            .add_pool("far", 0.5)
            .propagation(Duration::from_secs(2))
            .delay_for("far", Duration::from_secs(40))
            .build()
            .unwrap();

        let output = sim.run().unwrap();
        assert_eq!(output.outcomes[0].propagation, Duration::from_secs(2));
        assert_eq!(output.outcomes[1].propagation, Duration::from_secs(40));
    }
}
