//! Per-pool stale (orphan) block probabilities over a propagation timeline

use crate::{
    arrival::ArrivalModel,
    chart::{ChartSeries, ChartSurface},
    hashrate_dist::{HashrateDistribution, HashrateShare},
    timeline::PropagationTimeline,
};

/// Probability that a block found by a pool with hashrate share `share` is
/// orphaned by a competing block found while ours spends `delay` seconds
/// propagating. The competitors (combined share `1 - share`) must both find
/// a block inside the window and have the rest of the network extend theirs
/// first, which they do with probability equal to their combined share.
pub fn stale_before(
    model: &ArrivalModel,
    share: HashrateShare,
    delay: f64,
) -> f64 {
    let competitors = 1.0 - share;

    model.finds_within(delay, competitors) * competitors
}

/// Probability that a block found by the pool named `pool` is orphaned
/// because some other single pool found a block within `delay` seconds
/// before ours and extends its own find before ours reaches it.
///
/// Summed over each other pool individually: a pool only keeps mining on an
/// unpropagated block of its own, so only the finder's own share backs each
/// term. Pools are excluded by name, never by share value.
pub fn stale_after(
    model: &ArrivalModel,
    distribution: &HashrateDistribution,
    pool: &str,
    delay: f64,
) -> f64 {
    distribution
        .others(pool)
        .map(|(_, other)| model.finds_within(delay, other) * other)
        .sum()
}

/// Computes the stale probability of every pool at every timeline delay.
pub fn stale_rates(
    model: &ArrivalModel,
    distribution: &HashrateDistribution,
    timeline: &PropagationTimeline,
) -> StaleRateTable {
    let rows = distribution
        .iter()
        .map(|(name, share)| {
            let rates = timeline
                .iter()
                .map(|delay| {
                    stale_before(model, share, delay)
                        + stale_after(model, distribution, name, delay)
                })
                .collect();

            (name.to_string(), rates)
        })
        .collect();

    StaleRateTable {
        delays: timeline.delays().to_vec(),
        rows,
    }
}

/// Stale probability of each pool at each propagation delay, one row per
/// pool in distribution order, one value per delay.
///
/// Derived data: recomputation produces a fresh table, never an in-place
/// update.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleRateTable {
    delays: Vec<f64>,
    rows: Vec<(String, Vec<f64>)>,
}

impl StaleRateTable {
    /// The timeline delays the rates were computed over.
    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    /// Iterates over `(pool, rates)` rows in distribution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> + '_ {
        self.rows
            .iter()
            .map(|(name, rates)| (name.as_str(), rates.as_slice()))
    }

    /// Iterates over pool names in distribution order.
    pub fn pools(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    /// The rate row of the named pool, if present.
    pub fn rates_for(&self, pool: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(name, _)| name == pool)
            .map(|(_, rates)| rates.as_slice())
    }

    /// Number of pool rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Draws the table on `surface` as one line per pool, scaled to
    /// percentages.
    pub fn render_to(&self, surface: &mut dyn ChartSurface) {
        let series = self
            .rows
            .iter()
            .map(|(name, rates)| {
                let percents = rates.iter().map(|rate| rate * 100.0).collect();

                ChartSeries::new(name.clone(), percents)
            })
            .collect();

        surface.line_chart(
            &self.delays,
            series,
            "Propagation time (seconds)",
            "Stale rate (%)",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::CsvChart;

    fn default_table() -> StaleRateTable {
        stale_rates(
            &ArrivalModel::default(),
            &HashrateDistribution::default_pools(),
            &PropagationTimeline::default(),
        )
    }

    #[test]
    fn instant_propagation_is_never_stale() {
        let table = default_table();

        for (_, rates) in table.iter() {
            assert_eq!(rates[0], 0.0);
        }
    }

    #[test]
    fn rates_grow_with_propagation_delay() {
        let table = default_table();

        for (pool, rates) in table.iter() {
            for pair in rates.windows(2) {
                assert!(pair[0] < pair[1], "rate not increasing for {}", pool);
            }
        }
    }

    #[test]
    fn rates_are_probabilities() {
        let table = default_table();

        for (_, rates) in table.iter() {
            for &rate in rates {
                assert!((0.0..1.0).contains(&rate));
            }
        }
    }

    #[test]
    fn even_split_pools_face_identical_rates() {
        let distribution =
            HashrateDistribution::new([("A", 0.5), ("B", 0.5)]).unwrap();
        let timeline = PropagationTimeline::new([600.0]).unwrap();
        let table = stale_rates(
            &ArrivalModel::default(),
            &distribution,
            &timeline,
        );

        assert_eq!(table.rates_for("A"), table.rates_for("B"));
        assert!(table.rates_for("A").unwrap()[0] > 0.0);
    }

    #[test]
    fn uneven_pools_are_equally_stale_free_at_zero_delay() {
        let distribution =
            HashrateDistribution::new([("A", 0.6), ("B", 0.4)]).unwrap();
        let timeline = PropagationTimeline::new([0.0]).unwrap();
        let table = stale_rates(
            &ArrivalModel::default(),
            &distribution,
            &timeline,
        );

        assert_eq!(table.rates_for("A").unwrap()[0], 0.0);
        assert_eq!(table.rates_for("B").unwrap()[0], 0.0);
    }

    #[test]
    fn small_pools_suffer_more_than_dominant_ones() {
        let distribution =
            HashrateDistribution::new([("small", 0.01), ("big", 0.99)])
                .unwrap();
        let timeline = PropagationTimeline::new([6000.0]).unwrap();
        let table = stale_rates(
            &ArrivalModel::default(),
            &distribution,
            &timeline,
        );

        assert!(table.rates_for("small").unwrap()[0] > table.rates_for("big").unwrap()[0]);
    }

    #[test]
    fn a_monopoly_never_goes_stale() {
        let distribution = HashrateDistribution::new([("X", 1.0)]).unwrap();
        let table = stale_rates(
            &ArrivalModel::default(),
            &distribution,
            &PropagationTimeline::default(),
        );

        assert!(table.rates_for("X").unwrap().iter().all(|&rate| rate == 0.0));
    }

    #[test]
    fn default_pools_reproduce_known_rates_at_twenty_seconds() {
        let model = ArrivalModel::default();
        let pools = HashrateDistribution::default_pools();

        let combined: Vec<(&str, f64)> = pools
            .iter()
            .map(|(name, share)| {
                let rate = stale_before(&model, share, 20.0)
                    + stale_after(&model, &pools, name, 20.0);

                (name, rate)
            })
            .collect();

        // Known-good values for the largest and smallest default pools.
        assert_eq!(combined[0].0, "ANTPOOL");
        assert!((combined[0].1 - 0.020148145107644407).abs() < 1e-12);
        assert_eq!(combined[9].0, "TINY");
        assert!((combined[9].1 - 0.03964278784546968).abs() < 1e-12);
    }

    #[test]
    fn renders_percentages_per_pool() {
        let distribution =
            HashrateDistribution::new([("A", 0.5), ("B", 0.5)]).unwrap();
        let timeline = PropagationTimeline::new([0.0]).unwrap();
        let table = stale_rates(
            &ArrivalModel::default(),
            &distribution,
            &timeline,
        );

        let mut chart = CsvChart::new();
        table.render_to(&mut chart);

        let lines: Vec<_> = chart.as_str().lines().collect();
        assert_eq!(lines[0], "# Stale rate (%)");
        assert_eq!(lines[1], "Propagation time (seconds),A,B");
        assert_eq!(lines[2], "0.000000,0.000000,0.000000");
    }
}
