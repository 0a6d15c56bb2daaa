/*!
Re-export of common values and datatypes used for modeling and simulating
stale rates. Must be imported manually.

```
use stale_sim::prelude::*;
```
*/

use crate::{
    arrival, benefit, chart, hashrate_dist, results, simulation, stale_rate,
    strategy, timeline,
};

pub use arrival::{ArrivalModel, DEFAULT_BLOCK_INTERVAL_SECS};

pub use benefit::{benefits, benefits_from, BenefitTable};

pub use chart::{ChartSeries, ChartSurface, CsvChart};

pub use hashrate_dist::{
    HashrateDistribution, HashrateDistributionError, HashrateShare,
};

pub use results::{Average, Format, ResultsBuilder, ResultsTable};

pub use simulation::{
    PoolOutcome, Simulation, SimulationBuildError, SimulationBuilder,
    SimulationError, SimulationOutput,
};

pub use stale_rate::{stale_after, stale_before, stale_rates, StaleRateTable};

pub use strategy::{Action, ChainView, Honest, Selfish, Strategy};

pub use timeline::{PropagationTimeline, TimelineError};
