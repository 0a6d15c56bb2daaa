//! Propagation-delay timelines shared by all derived series

/// An ordered sequence of propagation delays (seconds), the shared x-axis
/// for stale-rate and benefit series.
///
/// Delays must be non-negative and non-decreasing; both are checked at
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationTimeline {
    delays: Vec<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("propagation delay {0} is negative or NaN")]
    BadDelay(f64),
    #[error("propagation delays decrease from {0} to {1}")]
    NotMonotonic(f64, f64),
}

impl PropagationTimeline {
    /// Creates a timeline from delay values in seconds.
    pub fn new<I>(delays: I) -> Result<Self, TimelineError>
    where
        I: IntoIterator<Item = f64>,
    {
        let delays: Vec<f64> = delays.into_iter().collect();

        for (i, &delay) in delays.iter().enumerate() {
            if delay.is_nan() || delay < 0.0 {
                return Err(TimelineError::BadDelay(delay));
            }
            if i > 0 && delay < delays[i - 1] {
                return Err(TimelineError::NotMonotonic(delays[i - 1], delay));
            }
        }

        Ok(PropagationTimeline { delays })
    }

    /// Creates the dense integer timeline `0, 1, ..., max` seconds.
    ///
    /// ```
    /// use stale_sim::timeline::PropagationTimeline;
    ///
    /// let timeline = PropagationTimeline::dense(20);
    /// assert_eq!(timeline.len(), 21);
    /// ```
    pub fn dense(max: u32) -> Self {
        PropagationTimeline {
            delays: (0..=max).map(f64::from).collect(),
        }
    }

    /// The delay values in seconds.
    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    /// Iterates over the delay values.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.delays.iter().copied()
    }

    /// Number of delay values.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

/// The dense integer timeline `0..=20` seconds.
impl Default for PropagationTimeline {
    fn default() -> Self {
        Self::dense(20)
    }
}
