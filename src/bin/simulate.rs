use std::{
    error::Error,
    time::{Duration, Instant},
};

use stale_sim::{
    arrival::ArrivalModel,
    hashrate_dist::HashrateDistribution,
    results::Average,
    simulation::SimulationBuilder,
    stale_rate::{stale_after, stale_before},
};

const PROPAGATION_SECS: f64 = 10.0;
const BLOCKS: usize = 100_000;
const REPEATS: usize = 10;

fn main() -> Result<(), Box<dyn Error>> {
    let start = Instant::now();

    let pools = HashrateDistribution::default_pools();
    let simulation = SimulationBuilder::new()
        .pools(&pools)
        .propagation(Duration::from_secs_f64(PROPAGATION_SECS))
        .blocks(BLOCKS)
        .repeat_all(REPEATS)
        .seed(17)
        .build()?;

    let data = simulation.run_all()?;

    let model = ArrivalModel::default();
    let predicted = pools
        .iter()
        .map(|(name, share)| {
            stale_before(&model, share, PROPAGATION_SECS)
                + stale_after(&model, &pools, name, PROPAGATION_SECS)
        })
        .collect();

    let results = data
        .average(Average::Mean)
        .blocks_found()
        .stale()
        .stale_rate()
        .benefit()
        .custom("Model Stale Rate", predicted)
        .build();

    println!("{}", results);
    println!("Elapsed time: {:.4} secs", start.elapsed().as_secs_f64());

    Ok(())
}
