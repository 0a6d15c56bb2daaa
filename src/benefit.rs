//! Relative revenue change per pool once difficulty re-adjusts
//!
//! Stale blocks slow the whole network down, so difficulty falls until
//! accepted blocks arrive on schedule again. A pool's long-run revenue then
//! follows its share of *accepted* blocks, not of found ones. The benefit of
//! a pool is the relative change between the two.

use crate::{
    arrival::ArrivalModel,
    chart::{ChartSeries, ChartSurface},
    hashrate_dist::HashrateDistribution,
    stale_rate::{stale_rates, StaleRateTable},
    timeline::PropagationTimeline,
};

/// Computes every pool's benefit at every timeline delay.
///
/// Equivalent to [`benefits_from`] applied to a freshly computed
/// [`StaleRateTable`].
pub fn benefits(
    model: &ArrivalModel,
    distribution: &HashrateDistribution,
    timeline: &PropagationTimeline,
) -> BenefitTable {
    benefits_from(&stale_rates(model, distribution, timeline), distribution)
}

/// Computes every pool's benefit from an existing stale-rate table.
///
/// At each delay, a pool keeps the fraction `1 - stale` of its found blocks,
/// the network as a whole keeps `1 - Σ share·stale`, and the pool's accepted
/// share is the ratio of the two weighted by its hashrate share. The benefit
/// is the relative change of the accepted share over the hashrate share.
///
/// # Panics
/// Panics if `stale_table` names a pool missing from `distribution`, or if
/// the weighted stale rates reach 1 (no block accepted at all, which no
/// valid stale-rate table produces).
pub fn benefits_from(
    stale_table: &StaleRateTable,
    distribution: &HashrateDistribution,
) -> BenefitTable {
    let delays = stale_table.delays();

    let mut total_found = vec![1.0; delays.len()];
    for (pool, rates) in stale_table.iter() {
        let share = distribution
            .share_of(pool)
            .expect("stale-rate pool present in the distribution");

        for (i, &rate) in rates.iter().enumerate() {
            total_found[i] -= share * rate;
        }
    }
    for (i, &found) in total_found.iter().enumerate() {
        assert!(found > 0.0, "all blocks stale at delay {}", delays[i]);
    }

    let rows = stale_table
        .iter()
        .map(|(pool, rates)| {
            let share = distribution
                .share_of(pool)
                .expect("stale-rate pool present in the distribution");
            let values = rates
                .iter()
                .zip(&total_found)
                .map(|(&rate, &found)| {
                    let actual_share = share * (1.0 - rate) / found;

                    (actual_share - share) / share
                })
                .collect();

            (pool.to_string(), values)
        })
        .collect();

    BenefitTable {
        delays: delays.to_vec(),
        rows,
    }
}

/// Relative revenue change of each pool at each propagation delay, one row
/// per pool in stale-table order, one value per delay. Values can be
/// negative.
#[derive(Debug, Clone, PartialEq)]
pub struct BenefitTable {
    delays: Vec<f64>,
    rows: Vec<(String, Vec<f64>)>,
}

impl BenefitTable {
    /// The timeline delays the benefits were computed over.
    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    /// Iterates over `(pool, benefits)` rows.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> + '_ {
        self.rows
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Iterates over pool names.
    pub fn pools(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    /// The benefit row of the named pool, if present.
    pub fn values_for(&self, pool: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(name, _)| name == pool)
            .map(|(_, values)| values.as_slice())
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
            .map(|(name, values)| {
                let percents =
                    values.iter().map(|value| value * 100.0).collect();

                ChartSeries::new(name.clone(), percents)
            })
            .collect();

        surface.line_chart(
            &self.delays,
            series,
            "Propagation time (seconds)",
            "Change in revenue (%)",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::CsvChart;

    #[test]
    fn instant_propagation_changes_no_revenue() {
        let distribution =
            HashrateDistribution::new([("A", 0.6), ("B", 0.4)]).unwrap();
        let timeline = PropagationTimeline::new([0.0]).unwrap();
        let table =
            benefits(&ArrivalModel::default(), &distribution, &timeline);

        assert_eq!(table.values_for("A"), Some([0.0].as_slice()));
        assert_eq!(table.values_for("B"), Some([0.0].as_slice()));
    }

    #[test]
    fn even_split_pools_gain_nothing_from_each_other() {
        let distribution =
            HashrateDistribution::new([("A", 0.5), ("B", 0.5)]).unwrap();
        let timeline = PropagationTimeline::new([600.0]).unwrap();
        let table =
            benefits(&ArrivalModel::default(), &distribution, &timeline);

        // Both pools lose the same blocks, so after re-adjustment neither
        // comes out ahead.
        let a = table.values_for("A").unwrap()[0];
        let b = table.values_for("B").unwrap()[0];
        assert_eq!(a, b);
        assert!(a.abs() <= 1e-12);
    }

    #[test]
    fn accepted_shares_partition_the_accepted_blocks() {
        let distribution = HashrateDistribution::default_pools();
        let table = benefits(
            &ArrivalModel::default(),
            &distribution,
            &PropagationTimeline::default(),
        );

        for i in 0..table.delays().len() {
            let total: f64 = table
                .iter()
                .map(|(pool, values)| {
                    let share = distribution.share_of(pool).unwrap();

                    share * (1.0 + values[i])
                })
                .sum();

            assert!((total - 1.0).abs() <= 1e-9);
        }
    }

    #[test]
    fn dominant_pools_profit_from_slow_propagation() {
        let distribution =
            HashrateDistribution::new([("small", 0.01), ("big", 0.99)])
                .unwrap();
        let timeline = PropagationTimeline::new([6000.0]).unwrap();
        let table =
            benefits(&ArrivalModel::default(), &distribution, &timeline);

        assert!(table.values_for("small").unwrap()[0] < 0.0);
        assert!(table.values_for("big").unwrap()[0] > 0.0);
    }

    #[test]
    fn a_monopoly_gains_nothing() {
        let distribution = HashrateDistribution::new([("X", 1.0)]).unwrap();
        let table = benefits(
            &ArrivalModel::default(),
            &distribution,
            &PropagationTimeline::default(),
        );

        assert!(table.values_for("X").unwrap().iter().all(|&value| value == 0.0));
    }

    #[test]
    fn renders_revenue_change_percentages() {
        let distribution =
            HashrateDistribution::new([("A", 0.5), ("B", 0.5)]).unwrap();
        let timeline = PropagationTimeline::new([0.0]).unwrap();
        let table =
            benefits(&ArrivalModel::default(), &distribution, &timeline);

        let mut chart = CsvChart::new();
        table.render_to(&mut chart);

        let lines: Vec<_> = chart.as_str().lines().collect();
        assert_eq!(lines[0], "# Change in revenue (%)");
        assert_eq!(lines[1], "Propagation time (seconds),A,B");
    }
}
