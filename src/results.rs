/*!
Control the appearance of simulation result data

# Working with [`ResultsBuilder`]

## Examples

Creating a [`ResultsTable`] after running a simulation:

```
use stale_sim::prelude::*;

let sim = SimulationBuilder::new()
    .add_pool("A", 0.1)
    .add_pool("B", 0.9)
    .blocks(100)
    .repeat_all(5)
    .seed(3)
    .build()
    .unwrap();

let results_builder = sim.run_all().unwrap();

let results = results_builder
    .average(Average::Median) // Take the median of repeated runs' results
    .stale_rate()             // Include the per-pool stale rate
    .benefit()                // Include the per-pool revenue change
    .format(Format::CSV)      // Output results as CSV
    .build();

println!("{}", results);
```
*/

use std::{collections::BTreeSet, fmt::Display};

use crate::{
    hashrate_dist::HashrateShare, simulation::SimulationOutput,
    utils::median_of_floats,
};

/// Floating point precision of results data.
pub const FLOAT_PRECISION_DIGITS: usize = 6;

/// Builder for [`ResultsTable`]. Produced by running a
/// [`Simulation`](crate::simulation::Simulation).
#[derive(Debug, Clone)]
pub struct ResultsBuilder {
    average: Average,
    columns: BTreeSet<Column>,
    data: Vec<SimulationOutput>,
    format: Format,
}

/// Describes the appearance of a [`ResultsTable`] as given by its
/// [`Display`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub enum Format {
    /// Comma-separated values, no padding.
    CSV,
    /// Whitespace-aligned for reading at a terminal.
    #[default]
    PrettyPrint,
}

impl ResultsBuilder {
    /// Creates a new [`ResultsBuilder`]. `data` holds at least one output
    /// and every output lists the same pools in the same order.
    pub(crate) fn new(data: Vec<SimulationOutput>) -> Self {
        Self {
            data,
            average: Average::default(),
            columns: BTreeSet::default(),
            format: Format::default(),
        }
    }

    /// Include the "Strategy", "Propagation (s)", "Blocks Found",
    /// "Accepted Blocks", "Stale Blocks", "Withheld Blocks", "Stale Rate",
    /// "Accepted Share", and "Benefit" columns.
    ///
    /// [`ResultsBuilder::average`] must still be called separately to
    /// create averaged data.
    pub fn all(self) -> Self {
        self.strategy_names()
            .propagation()
            .blocks_found()
            .accepted()
            .stale()
            .withheld()
            .stale_rate()
            .accepted_share()
            .benefit()
    }

    /// Average the results of repeated runs with the given [`Average`]
    /// method. For methods other than [`Average::None`], a column
    /// describing the averaging method is included in the results table.
    pub fn average(mut self, average: Average) -> Self {
        self.average = average;

        self
    }

    /// Include the "Strategy" column in the results table.
    pub fn strategy_names(mut self) -> Self {
        self.columns.insert(Column::Strategy);

        self
    }

    /// Include the "Propagation (s)" column in the results table.
    pub fn propagation(mut self) -> Self {
        self.columns.insert(Column::Propagation);

        self
    }

    /// Include the "Blocks Found" column in the results table.
    pub fn blocks_found(mut self) -> Self {
        self.columns.insert(Column::BlocksFound);

        self
    }

    /// Include the "Accepted Blocks" column in the results table.
    pub fn accepted(mut self) -> Self {
        self.columns.insert(Column::Accepted);

        self
    }

    /// Include the "Stale Blocks" column in the results table.
    pub fn stale(mut self) -> Self {
        self.columns.insert(Column::Stale);

        self
    }

    /// Include the "Withheld Blocks" column in the results table.
    pub fn withheld(mut self) -> Self {
        self.columns.insert(Column::Withheld);

        self
    }

    /// Include the "Stale Rate" column (stale blocks per resolved block)
    /// in the results table.
    pub fn stale_rate(mut self) -> Self {
        self.columns.insert(Column::StaleRate);

        self
    }

    /// Include the "Accepted Share" column (fraction of the canonical
    /// chain) in the results table.
    pub fn accepted_share(mut self) -> Self {
        self.columns.insert(Column::AcceptedShare);

        self
    }

    /// Include the "Benefit" column (relative change of the accepted share
    /// over the hashrate share) in the results table.
    pub fn benefit(mut self) -> Self {
        self.columns.insert(Column::Benefit);

        self
    }

    /// Include a column with title `title` holding one caller-supplied
    /// value per pool, in the order pools were added.
    ///
    /// # Panics
    /// Table construction panics if `values` holds fewer entries than
    /// there are pools.
    pub fn custom<T>(mut self, title: T, values: Vec<f64>) -> Self
    where
        T: Into<String>,
    {
        self.columns.insert(Column::Custom(NamedSeries {
            title: title.into(),
            values,
        }));

        self
    }

    /// Sets the [`Format`] the results table will render with.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;

        self
    }

    /// Extract the raw [`SimulationOutput`] data from this
    /// [`ResultsBuilder`]. Useful for running custom statistical analysis.
    ///
    /// # Ordering
    /// Repeated runs appear in execution order.
    pub fn data(self) -> Vec<SimulationOutput> {
        self.data
    }

    /// Creates a new [`ResultsTable`].
    pub fn build(self) -> ResultsTable {
        let ResultsBuilder { average, mut columns, data, format } = self;

        // Every table identifies its rows.
        columns.insert(Column::Pool);
        columns.insert(Column::Hashrate);

        match average {
            Average::None => (),
            _ => {
                columns.insert(Column::AverageOf(average));
            }
        }

        let columns = Vec::from_iter(columns);
        let num_pools = data[0].outcomes.len();

        let mut rows = Vec::new();
        match average {
            Average::None => {
                for output in data.iter() {
                    for pool in 0..num_pools {
                        rows.push(
                            columns
                                .iter()
                                .map(|col_type| col_type.get_value(output, pool))
                                .collect(),
                        );
                    }
                }
            }
            _ => {
                for pool in 0..num_pools {
                    rows.push(
                        columns
                            .iter()
                            .map(|col_type| {
                                col_type.get_average_value(average, &data, pool)
                            })
                            .collect(),
                    );
                }
            }
        }

        ResultsTable { columns, format, rows }
    }
}

/// Formatted results from the completion of a simulation's runs. The
/// results table is given by the struct's [`Display`] implementation, as
/// specified by its [`Format`].
pub struct ResultsTable {
    columns: Vec<Column>,
    format: Format,
    rows: Vec<Vec<ColumnValue>>,
}

impl ResultsTable {
    const SEPARATOR_VERTICAL: char = '|';
    const SEPARATOR_HORIZONTAL: char = '-';

    /// The [`Format`] the table renders with.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Changes the [`Format`] used by the table's [`Display`]
    /// implementation.
    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }
}

impl Display for ResultsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let titles: Vec<String> =
            self.columns.iter().map(Column::to_string).collect();
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ColumnValue::to_string).collect())
            .collect();

        match self.format {
            Format::CSV => {
                write!(f, "{}", titles.join(","))?;

                for row in rows {
                    write!(f, "\n{}", row.join(","))?;
                }
            }
            Format::PrettyPrint => {
                let widths: Vec<usize> = titles
                    .iter()
                    .enumerate()
                    .map(|(i, title)| {
                        rows.iter()
                            .map(|row| row[i].len())
                            .fold(title.len(), usize::max)
                    })
                    .collect();

                for (title, &width) in titles.iter().zip(&widths) {
                    write!(
                        f,
                        " {:1$} {2}",
                        title, width, Self::SEPARATOR_VERTICAL
                    )?;
                }
                writeln!(f)?;

                let ruler: usize = widths.iter().map(|width| width + 3).sum();
                for _ in 0..ruler {
                    write!(f, "{}", Self::SEPARATOR_HORIZONTAL)?;
                }

                for row in rows {
                    writeln!(f)?;

                    for (value, &width) in row.iter().zip(&widths) {
                        write!(
                            f,
                            " {:1$} {2}",
                            value, width, Self::SEPARATOR_VERTICAL
                        )?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Methods of collapsing repeated simulation runs into a single value per
/// pool. Only applied to the columns whose values change from run to run.
#[repr(u8)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Average {
    #[default]
    /// Keep each run's values as their own row.
    None,
    /// Arithmetic mean across runs.
    Mean,
    /// Median across runs.
    Median,
    /// Largest value across runs.
    Max,
    /// Smallest value across runs.
    Min,
}

/// Type of column that can appear in a data table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Column {
    // Variant order determines the order of columns in results tables:
    // https://doc.rust-lang.org/stable/std/cmp/trait.PartialOrd.html#derivable
    Pool,
    Strategy,
    Hashrate,
    Propagation,
    AverageOf(Average),
    BlocksFound,
    Accepted,
    Stale,
    Withheld,
    StaleRate,
    AcceptedShare,
    Benefit,
    Custom(NamedSeries),
}

/// Caller-supplied per-pool values shown under a custom title. Identified
/// by title alone.
#[derive(Debug, Clone)]
struct NamedSeries {
    title: String,
    values: Vec<f64>,
}

impl PartialEq for NamedSeries {
    fn eq(&self, other: &Self) -> bool {
        self.title.eq(&other.title)
    }
}

impl Eq for NamedSeries {}

impl PartialOrd for NamedSeries {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NamedSeries {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.title.cmp(&other.title)
    }
}

impl std::hash::Hash for NamedSeries {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.title.hash(state);
    }
}

/// Value which corresponds to a [`Column`].
#[derive(Debug, Clone)]
enum ColumnValue {
    Pool(String),
    Strategy(String),
    Hashrate(HashrateShare),
    Propagation(f64),
    AverageOf(usize),
    BlocksFound(f64),
    Accepted(f64),
    Stale(f64),
    Withheld(f64),
    StaleRate(f64),
    AcceptedShare(f64),
    Benefit(f64),
    Custom(f64),
}

#[inline]
fn benefit_of(output: &SimulationOutput, pool: usize) -> f64 {
    let share = output.outcomes[pool].share;

    (output.accepted_share(pool) - share) / share
}

impl Column {
    fn get_value(&self, output: &SimulationOutput, pool: usize) -> ColumnValue {
        let outcome = &output.outcomes[pool];

        match &self {
            Self::Pool => ColumnValue::Pool(outcome.name.clone()),
            Self::Strategy => ColumnValue::Strategy(outcome.strategy.clone()),
            Self::Hashrate => ColumnValue::Hashrate(outcome.share),
            Self::Propagation => {
                ColumnValue::Propagation(outcome.propagation.as_secs_f64())
            }
            Self::BlocksFound => ColumnValue::BlocksFound(outcome.found as f64),
            Self::Accepted => ColumnValue::Accepted(outcome.accepted as f64),
            Self::Stale => ColumnValue::Stale(outcome.stale as f64),
            Self::Withheld => ColumnValue::Withheld(outcome.withheld as f64),
            Self::StaleRate => ColumnValue::StaleRate(outcome.stale_rate()),
            Self::AcceptedShare => {
                ColumnValue::AcceptedShare(output.accepted_share(pool))
            }
            Self::Benefit => ColumnValue::Benefit(benefit_of(output, pool)),
            Self::Custom(series) => ColumnValue::Custom(series.values[pool]),
            Self::AverageOf(_) => {
                unreachable!("the average descriptor column has no raw value")
            }
        }
    }

    fn get_average_value(
        &self,
        method: Average,
        data: &[SimulationOutput],
        pool: usize,
    ) -> ColumnValue {
        match &self {
            Self::AverageOf(_) => return ColumnValue::AverageOf(data.len()),
            Self::Pool
            | Self::Strategy
            | Self::Hashrate
            | Self::Propagation
            | Self::Custom(_) => return self.get_value(&data[0], pool),
            Self::BlocksFound
            | Self::Accepted
            | Self::Stale
            | Self::Withheld
            | Self::StaleRate
            | Self::AcceptedShare
            | Self::Benefit => (),
        }

        let vls: Vec<_> = data
            .iter()
            .map(|output| match &self {
                Self::BlocksFound => output.outcomes[pool].found as f64,
                Self::Accepted => output.outcomes[pool].accepted as f64,
                Self::Stale => output.outcomes[pool].stale as f64,
                Self::Withheld => output.outcomes[pool].withheld as f64,
                Self::StaleRate => output.outcomes[pool].stale_rate(),
                Self::AcceptedShare => output.accepted_share(pool),
                Self::Benefit => benefit_of(output, pool),
                _ => unreachable!(),
            })
            .collect();

        let avg = match method {
            Average::Mean => vls.iter().sum::<f64>() / vls.len() as f64,
            Average::Median => median_of_floats(vls),
            Average::Max => vls.into_iter().fold(f64::MIN, f64::max),
            Average::Min => vls.into_iter().fold(f64::MAX, f64::min),
            Average::None => unreachable!(),
        };

        match &self {
            Self::BlocksFound => ColumnValue::BlocksFound(avg),
            Self::Accepted => ColumnValue::Accepted(avg),
            Self::Stale => ColumnValue::Stale(avg),
            Self::Withheld => ColumnValue::Withheld(avg),
            Self::StaleRate => ColumnValue::StaleRate(avg),
            Self::AcceptedShare => ColumnValue::AcceptedShare(avg),
            Self::Benefit => ColumnValue::Benefit(avg),
            _ => unreachable!(),
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::Pool => write!(f, "Pool"),
            Self::Strategy => write!(f, "Strategy"),
            Self::Hashrate => write!(f, "Hashrate"),
            Self::Propagation => write!(f, "Propagation (s)"),
            Self::AverageOf(method) => match method {
                Average::Mean => write!(f, "Mean Of"),
                Average::Median => write!(f, "Median Of"),
                Average::Max => write!(f, "Max Of"),
                Average::Min => write!(f, "Min Of"),
                Average::None => unreachable!(),
            },
            Self::BlocksFound => write!(f, "Blocks Found"),
            Self::Accepted => write!(f, "Accepted Blocks"),
            Self::Stale => write!(f, "Stale Blocks"),
            Self::Withheld => write!(f, "Withheld Blocks"),
            Self::StaleRate => write!(f, "Stale Rate"),
            Self::AcceptedShare => write!(f, "Accepted Share"),
            Self::Benefit => write!(f, "Benefit"),
            Self::Custom(series) => write!(f, "{}", series.title),
        }
    }
}

impl Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::Pool(name) => write!(f, "{}", name),
            Self::Strategy(name) => write!(f, "{}", name),
            Self::AverageOf(repeats) => write!(f, "{}", repeats),
            Self::Hashrate(value)
            | Self::Propagation(value)
            | Self::BlocksFound(value)
            | Self::Accepted(value)
            | Self::Stale(value)
            | Self::Withheld(value)
            | Self::StaleRate(value)
            | Self::AcceptedShare(value)
            | Self::Benefit(value)
            | Self::Custom(value) => {
                write!(f, "{:.1$}", value, FLOAT_PRECISION_DIGITS)
            }
        }
    }
}
