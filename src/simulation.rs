//! Building and running discrete-event simulations of block propagation.
//!
//! The simulation mirrors Bitcoin Core's behaviour: a miner mines on top of
//! its own blocks immediately and only switches to a propagated chain when
//! that chain is strictly longer, with ties between equal-length chains
//! going to the first-seen tip. Block discovery is a Poisson process; the
//! finder of each block is drawn from the hashrate distribution. Difficulty
//! and network hashrate are constant.

use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};

use rand::{
    distributions::{WeightedError, WeightedIndex},
    prelude::Distribution,
    rngs::StdRng,
    SeedableRng,
};
use rand_distr::{Exp, ExpError};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    hashrate_dist::HashrateShare,
    results::ResultsBuilder,
    strategy::{Action, ChainView, Strategy},
};

pub mod builder;

pub use builder::{SimulationBuildError, SimulationBuilder};

/// A simulation of the mining and propagation process over a fixed set of
/// pools. Built with a [`SimulationBuilder`].
#[derive(Debug, Clone)]
pub struct Simulation {
    miners: Vec<SimMiner>,
    blocks: usize,
    repeat_all: usize,
    block_interval: Duration,
    seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("could not create rand::distributions::WeightedIndex")]
    WeightedIndexError(#[from] WeightedError),
    #[error("could not create the block interval distribution")]
    ExponentialError(#[from] ExpError),
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    /// Runs the simulation once.
    pub fn run(&self) -> Result<SimulationOutput, SimulationError> {
        self.clone().run_seeded(self.seed)
    }

    /// Runs the configured number of repetitions and hands their outputs to
    /// the results pipeline. Repetitions of a seeded simulation use
    /// consecutive seeds.
    pub fn run_all(self) -> Result<ResultsBuilder, SimulationError> {
        let seeds: Vec<Option<u64>> = (0..self.repeat_all)
            .map(|run| self.seed.map(|seed| seed.wrapping_add(run as u64)))
            .collect();
        let runs: Vec<_> =
            seeds.into_iter().map(|seed| (self.clone(), seed)).collect();

        #[cfg(feature = "rayon")]
        let outputs: Result<Vec<_>, _> = runs
            .into_par_iter()
            .map(|(sim, seed)| sim.run_seeded(seed))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let outputs: Result<Vec<_>, _> =
            runs.into_iter().map(|(sim, seed)| sim.run_seeded(seed)).collect();

        Ok(ResultsBuilder::new(outputs?))
    }

    /// Executes the simulation until the target number of blocks has been
    /// found and every pending block has propagated.
    fn run_seeded(
        mut self,
        seed: Option<u64>,
    ) -> Result<SimulationOutput, SimulationError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let weights: Vec<HashrateShare> =
            self.miners.iter().map(|miner| miner.share).collect();
        let finders = WeightedIndex::new(weights)?;
        let intervals = Exp::new(self.block_interval.as_secs_f64().recip())?;

        let mut canonical = vec![SimBlock::GENESIS];
        let mut arrivals: BinaryHeap<Reverse<Duration>> = BinaryHeap::new();
        let mut now = Duration::ZERO;
        let mut next_found =
            Duration::from_secs_f64(intervals.sample(&mut rng));
        let mut found = 0;

        while found < self.blocks || !arrivals.is_empty() {
            let next_arrival =
                arrivals.peek().map(|&Reverse(instant)| instant);
            let found_next = found < self.blocks
                && next_arrival.map_or(true, |instant| next_found <= instant);

            if found_next {
                now = next_found;
                let finder = finders.sample(&mut rng);
                self.miners[finder].found_block(
                    now,
                    canonical.len(),
                    &mut arrivals,
                );
                next_found =
                    now + Duration::from_secs_f64(intervals.sample(&mut rng));
                found += 1;
            } else {
                // Arrival instants only wake the loop up; published state is
                // derived from the block arrival times themselves.
                now = next_arrival.expect("a block left to find or deliver");
                while arrivals.peek() == Some(&Reverse(now)) {
                    arrivals.pop();
                }
            }

            update_canonical(&self.miners, &mut canonical, now);
            for miner in self.miners.iter_mut() {
                miner.notify_best_chain(&canonical, now, &mut arrivals);
            }
        }

        // Genesis sits at index 0 and belongs to no pool.
        let mut accepted = vec![0; self.miners.len()];
        for block in &canonical[1..] {
            accepted[block.miner.0] += 1;
        }

        let outcomes = self
            .miners
            .into_iter()
            .zip(accepted)
            .map(|(miner, accepted)| PoolOutcome {
                withheld: miner.withheld_len() as u64,
                strategy: miner.strategy.name(),
                name: miner.name,
                share: miner.share,
                propagation: miner.propagation,
                found: miner.found,
                accepted,
                stale: miner.stale,
            })
            .collect();

        Ok(SimulationOutput {
            outcomes,
            chain_length: canonical.len(),
            elapsed: now,
            blocks: found,
        })
    }
}

/// Adopts the best published chain among `miners` into `canonical`: the
/// longest fully propagated chain, with ties going to the earliest tip
/// arrival (the first-seen rule).
fn update_canonical(
    miners: &[SimMiner],
    canonical: &mut Vec<SimBlock>,
    now: Duration,
) {
    let mut best = None;
    let mut best_len = canonical.len();
    let mut best_tip = tip_arrival(canonical);

    for (index, miner) in miners.iter().enumerate() {
        let len = miner.published_len(now);
        let tip = miner.chain[len - 1].arrival;
        if len > best_len || (len == best_len && tip < best_tip) {
            best = Some(index);
            best_len = len;
            best_tip = tip;
        }
    }

    if let Some(index) = best {
        let published = &miners[index].chain[..best_len];
        let shared = common_prefix_len(canonical, published);
        canonical.truncate(shared);
        canonical.extend_from_slice(&published[shared..]);
    }
}

fn tip_arrival(chain: &[SimBlock]) -> Duration {
    chain.last().map_or(Duration::ZERO, |block| block.arrival)
}

/// Longest shared prefix of two chains. A block is unique to its finder and
/// arrival instant, so an equal block at some height implies equal ancestry
/// and the scan can run backward from the tip.
fn common_prefix_len(a: &[SimBlock], b: &[SimBlock]) -> usize {
    let shorter = a.len().min(b.len());

    (0..shorter).rev().find(|&i| a[i] == b[i]).map_or(0, |i| i + 1)
}

/// One mining pool's full node: its chain, its strategy, and its counters.
#[derive(Debug, Clone)]
struct SimMiner {
    id: MinerId,
    name: String,
    share: HashrateShare,
    propagation: Duration,
    strategy: Box<dyn Strategy>,
    /// Local chain, genesis first. May differ between miners while blocks
    /// propagate.
    chain: Vec<SimBlock>,
    found: u64,
    stale: u64,
}

impl SimMiner {
    /// Adds a block found at `now` to the local chain, letting the strategy
    /// decide whether it (and any withheld predecessors) gets broadcast.
    fn found_block(
        &mut self,
        now: Duration,
        best_len: usize,
        arrivals: &mut BinaryHeap<Reverse<Duration>>,
    ) {
        self.found += 1;

        let view = ChainView {
            local_len: self.chain.len(),
            private_len: self.withheld_len(),
            best_len,
        };
        let arrival = now + self.propagation;

        match self.strategy.next_block(&view) {
            Action::Publish => {
                self.chain.push(SimBlock::new(self.id, arrival));
                arrivals.push(Reverse(arrival));
            }
            Action::Withhold => {
                self.chain.push(SimBlock::new(self.id, SimBlock::WITHHELD));
            }
            Action::PublishAll => {
                let start = self.chain.len() - view.private_len;
                for block in &mut self.chain[start..] {
                    block.arrival = arrival;
                }
                self.chain.push(SimBlock::new(self.id, arrival));
                arrivals.push(Reverse(arrival));
            }
        }
    }

    /// Lets this miner react to the latest best published chain.
    fn notify_best_chain(
        &mut self,
        canonical: &[SimBlock],
        now: Duration,
        arrivals: &mut BinaryHeap<Reverse<Duration>>,
    ) {
        self.maybe_reveal(canonical.len(), now, arrivals);
        self.maybe_reorg(canonical);
    }

    /// Asks the strategy how many withheld blocks to broadcast, oldest
    /// first.
    fn maybe_reveal(
        &mut self,
        best_len: usize,
        now: Duration,
        arrivals: &mut BinaryHeap<Reverse<Duration>>,
    ) {
        let view = ChainView {
            local_len: self.chain.len(),
            private_len: self.withheld_len(),
            best_len,
        };

        let count = self.strategy.reveal_count(&view);
        if count == 0 {
            return;
        }
        debug_assert!(count <= view.private_len);

        let arrival = now + self.propagation;
        let start = self.chain.len() - view.private_len;
        for block in &mut self.chain[start..start + count] {
            block.arrival = arrival;
        }
        arrivals.push(Reverse(arrival));
    }

    /// Switches to `canonical` when it is strictly longer, counting every
    /// replaced block of our own as stale.
    fn maybe_reorg(&mut self, canonical: &[SimBlock]) {
        if canonical.len() <= self.chain.len() {
            return;
        }

        let shared = common_prefix_len(&self.chain, canonical);
        for block in self.chain.drain(shared..) {
            if block.miner == self.id {
                self.stale += 1;
            }
        }
        self.chain.extend_from_slice(&canonical[shared..]);
    }

    /// Length of the prefix of the local chain that has reached every other
    /// miner by `now`. Arrival times are monotonic along the chain.
    fn published_len(&self, now: Duration) -> usize {
        self.chain
            .iter()
            .rposition(|block| block.arrival <= now)
            .map_or(0, |i| i + 1)
    }

    /// Number of trailing blocks of the local chain not yet broadcast.
    fn withheld_len(&self) -> usize {
        self.chain
            .iter()
            .rev()
            .take_while(|block| block.arrival == SimBlock::WITHHELD)
            .count()
    }
}

/// A mined block: who found it and when the rest of the network receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SimBlock {
    miner: MinerId,
    arrival: Duration,
}

impl SimBlock {
    /// Arrival instant of blocks a miner has not (yet) broadcast.
    const WITHHELD: Duration = Duration::MAX;

    /// The genesis block, found by nobody and received immediately.
    const GENESIS: SimBlock = SimBlock {
        miner: MinerId::GENESIS,
        arrival: Duration::ZERO,
    };

    fn new(miner: MinerId, arrival: Duration) -> Self {
        SimBlock { miner, arrival }
    }
}

/// Index of a pool in the order pools were added to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct MinerId(usize);

impl MinerId {
    const GENESIS: MinerId = MinerId(usize::MAX);
}

/// Output data from a single simulation run.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// Per-pool outcomes, in the order pools were added.
    pub outcomes: Vec<PoolOutcome>,
    /// Blocks in the final canonical chain, genesis included.
    pub chain_length: usize,
    /// Simulated timespan.
    pub elapsed: Duration,
    /// Total number of blocks found across all pools.
    pub blocks: usize,
}

impl SimulationOutput {
    /// Fraction of the canonical chain found by the pool at `pool_index`;
    /// 0 when the chain holds nothing besides genesis.
    pub fn accepted_share(&self, pool_index: usize) -> f64 {
        let resolved = self.chain_length.saturating_sub(1);
        if resolved == 0 {
            return 0.0;
        }

        self.outcomes[pool_index].accepted as f64 / resolved as f64
    }
}

/// What became of one pool's blocks during a run.
#[derive(Debug, Clone)]
pub struct PoolOutcome {
    pub name: String,
    pub share: HashrateShare,
    pub propagation: Duration,
    /// Name of the strategy the pool followed.
    pub strategy: String,
    /// Blocks found, whatever became of them.
    pub found: u64,
    /// Own blocks in the final canonical chain.
    pub accepted: u64,
    /// Own blocks reorged out of the pool's chain.
    pub stale: u64,
    /// Own blocks never broadcast.
    pub withheld: u64,
}

impl PoolOutcome {
    /// Stale blocks per resolved (accepted or stale) block; 0 when nothing
    /// was resolved.
    pub fn stale_rate(&self) -> f64 {
        let resolved = self.accepted + self.stale;
        if resolved == 0 {
            return 0.0;
        }

        self.stale as f64 / resolved as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hashrate_dist::HashrateDistribution, strategy::Selfish};

    #[test]
    fn instant_propagation_produces_no_stale_blocks() {
        let sim = SimulationBuilder::new()
            .add_pool("A", 0.5)
            .add_pool("B", 0.5)
            .blocks(2_000)
            .seed(7)
            .build()
            .expect("valid simulation build");
        let output = sim.run().unwrap();

        assert_eq!(output.chain_length, 2_001);
        for outcome in &output.outcomes {
            assert_eq!(outcome.stale, 0);
            assert_eq!(outcome.withheld, 0);
            assert_eq!(outcome.stale_rate(), 0.0);
        }

        let accepted: u64 =
            output.outcomes.iter().map(|outcome| outcome.accepted).sum();
        assert_eq!(accepted, 2_000);
    }

    #[test]
    fn accepted_blocks_partition_the_canonical_chain() {
        let sim = SimulationBuilder::new()
            .pools(&HashrateDistribution::default_pools())
            .propagation(Duration::from_secs(30))
            .blocks(5_000)
            .seed(11)
            .build()
            .unwrap();
        let output = sim.run().unwrap();

        let accepted: u64 =
            output.outcomes.iter().map(|outcome| outcome.accepted).sum();
        assert_eq!(accepted, (output.chain_length - 1) as u64);

        let found: u64 =
            output.outcomes.iter().map(|outcome| outcome.found).sum();
        assert_eq!(found, output.blocks as u64);

        for outcome in &output.outcomes {
            assert!(
                outcome.accepted + outcome.stale + outcome.withheld
                    <= outcome.found
            );
        }
    }

    #[test]
    fn longer_propagation_causes_more_stale_blocks() {
        let stale_with_delay = |delay| {
            let sim = SimulationBuilder::new()
                .add_pool("A", 0.5)
                .add_pool("B", 0.5)
                .propagation(Duration::from_secs(delay))
                .blocks(20_000)
                .seed(23)
                .build()
                .unwrap();
            let output = sim.run().unwrap();

            output.outcomes.iter().map(|outcome| outcome.stale).sum::<u64>()
        };

        let slow = stale_with_delay(60);
        let fast = stale_with_delay(5);
        assert!(slow > fast, "{} stale at 60s vs {} at 5s", slow, fast);
        assert!(fast > 0);
    }

    #[test]
    fn selfish_bookkeeping_stays_consistent() {
        let sim = SimulationBuilder::new()
            .add_pool("honest", 0.6)
            .add_pool_with("selfish", 0.4, Selfish::new())
            .blocks(10_000)
            .seed(42)
            .build()
            .unwrap();
        let output = sim.run().unwrap();

        let accepted: u64 =
            output.outcomes.iter().map(|outcome| outcome.accepted).sum();
        assert_eq!(accepted, (output.chain_length - 1) as u64);

        let honest = &output.outcomes[0];
        assert_eq!(honest.strategy, "Honest");
        assert_eq!(honest.withheld, 0);
        // Withheld blocks revealed at the right moment orphan honest ones.
        assert!(honest.stale > 0);

        let selfish = &output.outcomes[1];
        assert_eq!(selfish.strategy, "Selfish");
        assert!(selfish.stale > 0);
        assert!(
            selfish.accepted + selfish.stale + selfish.withheld
                <= selfish.found
        );
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let build = || {
            SimulationBuilder::new()
                .add_pool("A", 0.3)
                .add_pool("B", 0.7)
                .propagation(Duration::from_secs(10))
                .blocks(500)
                .seed(5)
                .build()
                .unwrap()
        };

        let first = build().run().unwrap();
        let second = build().run().unwrap();

        assert_eq!(first.chain_length, second.chain_length);
        assert_eq!(first.elapsed, second.elapsed);
        for (a, b) in first.outcomes.iter().zip(&second.outcomes) {
            assert_eq!(a.found, b.found);
            assert_eq!(a.accepted, b.accepted);
            assert_eq!(a.stale, b.stale);
            assert_eq!(a.withheld, b.withheld);
        }
    }
}
