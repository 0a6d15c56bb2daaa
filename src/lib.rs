/*!
Stale rate modeling for proof-of-work mining pools.

Estimates the probability that a pool's blocks go stale as a function of
block propagation time, along with the revenue change each pool sees once
difficulty re-adjusts to the network's stale rate. A closed-form model
lives in [`stale_rate`] and [`benefit`]; [`simulation`] checks the model
against event-driven Monte Carlo runs of the network.

Most workflows only need the [`prelude`]:

```
use stale_sim::prelude::*;

let model = ArrivalModel::default();
let pools = HashrateDistribution::default_pools();
let timeline = PropagationTimeline::default();

let rates = stale_rates(&model, &pools, &timeline);
let gains = benefits_from(&rates, &pools);

let mut chart = CsvChart::new();
rates.render_to(&mut chart);
gains.render_to(&mut chart);
println!("{}", chart);
```
*/

pub mod arrival;
pub mod benefit;
pub mod chart;
pub mod hashrate_dist;
pub mod prelude;
pub mod results;
pub mod simulation;
pub mod stale_rate;
pub mod strategy;
pub mod timeline;

pub(crate) mod utils;
