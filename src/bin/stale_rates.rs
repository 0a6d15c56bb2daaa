use std::error::Error;

use stale_sim::{
    arrival::ArrivalModel, benefit::benefits_from, chart::CsvChart,
    hashrate_dist::HashrateDistribution, stale_rate::stale_rates,
    timeline::PropagationTimeline,
};

const MAX_PROPAGATION_SECS: u32 = 20;

fn main() -> Result<(), Box<dyn Error>> {
    let model = ArrivalModel::default();
    let pools = HashrateDistribution::default_pools();
    let timeline = PropagationTimeline::dense(MAX_PROPAGATION_SECS);

    let rates = stale_rates(&model, &pools, &timeline);
    let gains = benefits_from(&rates, &pools);

    let mut chart = CsvChart::new();
    rates.render_to(&mut chart);
    gains.render_to(&mut chart);

    print!("{}", chart);

    Ok(())
}
