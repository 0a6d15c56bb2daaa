//! Seam between computed tables and chart rendering.
//!
//! Real plotting backends live outside this crate; [`CsvChart`] is the
//! in-crate text backend used by the demo binaries and tests.

use std::fmt::Display;

use crate::results::FLOAT_PRECISION_DIGITS;

/// One named line in a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn new<L>(label: L, values: Vec<f64>) -> Self
    where
        L: Into<String>,
    {
        ChartSeries {
            label: label.into(),
            values,
        }
    }
}

/// A surface that can draw line charts from computed series.
///
/// Each series holds one value per entry of `x_values`. Legend ordering and
/// all other presentation details belong to the implementation.
pub trait ChartSurface {
    /// Draws one chart: a line per series over the shared `x_values`.
    fn line_chart(
        &mut self,
        x_values: &[f64],
        series: Vec<ChartSeries>,
        x_label: &str,
        y_label: &str,
    );
}

/// Text backend that renders each chart as a CSV block.
///
/// A block starts with a `# <y_label>` title line, then a header naming the
/// x-axis and every series, then one row per x value. Blocks are separated
/// by a blank line. The accumulated text is given by the struct's [`Display`]
/// implementation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvChart {
    rendered: String,
}

impl CsvChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated CSV text.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl ChartSurface for CsvChart {
    fn line_chart(
        &mut self,
        x_values: &[f64],
        series: Vec<ChartSeries>,
        x_label: &str,
        y_label: &str,
    ) {
        if !self.rendered.is_empty() {
            self.rendered.push('\n');
        }

        let labels: Vec<_> =
            series.iter().map(|series| series.label.as_str()).collect();

        self.rendered.push_str(&format!("# {}\n", y_label));
        self.rendered
            .push_str(&format!("{},{}\n", x_label, labels.join(",")));

        for (i, x) in x_values.iter().enumerate() {
            let row: Vec<_> = series
                .iter()
                .map(|series| {
                    format!("{:.1$}", series.values[i], FLOAT_PRECISION_DIGITS)
                })
                .collect();

            self.rendered.push_str(&format!(
                "{:.1$},{2}\n",
                x,
                FLOAT_PRECISION_DIGITS,
                row.join(",")
            ));
        }
    }
}

impl Display for CsvChart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rendered)
    }
}
