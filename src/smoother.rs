//! Probability smoothing
//!
//! A centered rolling mean over the per-row class probabilities suppresses
//! single-step prediction noise. The smoothed awake probability is kept as
//! the row `score`; the smoothed not-awake probability, rounded half-to-even,
//! becomes the `smooth` signal that segmentation consumes.
//!
//! Rows with no complete window anywhere in their scope (input shorter than
//! the smoothing width) have neither value, and segmentation treats them as
//! inactive.

use crate::config::{PipelineConfig, WindowScope};
use crate::window::{self, RollingStat};

/// Smoothed values for one row; `None` when no window could be formed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    pub score: Option<f64>,
    pub smooth: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Smoother {
    window: usize,
    scope: WindowScope,
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Smoother {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            window: config.smoothing_window,
            scope: config.window_scope,
        }
    }

    /// Smooth `(not_awake, awake)` pairs given in row order. `series_ids`
    /// is only consulted when windows restart per series.
    pub fn smooth<'a, I>(&self, series_ids: I, probabilities: &[[f64; 2]]) -> Vec<Smoothed>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let not_awake: Vec<f64> = probabilities.iter().map(|p| p[0]).collect();
        let awake: Vec<f64> = probabilities.iter().map(|p| p[1]).collect();

        let (not_awake, awake) = match self.scope {
            WindowScope::Global => (
                window::centered_filled_sparse(&not_awake, self.window, RollingStat::Mean),
                window::centered_filled_sparse(&awake, self.window, RollingStat::Mean),
            ),
            WindowScope::PerSeries => {
                let groups = window::group_rows(series_ids);
                (
                    window::centered_filled_sparse_grouped(
                        &not_awake,
                        &groups,
                        self.window,
                        RollingStat::Mean,
                    ),
                    window::centered_filled_sparse_grouped(
                        &awake,
                        &groups,
                        self.window,
                        RollingStat::Mean,
                    ),
                )
            }
        };

        let unsmoothed = not_awake.iter().filter(|v| v.is_none()).count();
        if unsmoothed > 0 {
            log::warn!(
                "{} of {} rows have no complete smoothing window of width {}; left unsmoothed",
                unsmoothed,
                probabilities.len(),
                self.window
            );
        }
        log::debug!(
            "smoothed {} probability rows with window {}",
            probabilities.len(),
            self.window
        );

        not_awake
            .into_iter()
            .zip(awake)
            .map(|(not_awake, awake)| Smoothed {
                score: awake,
                smooth: not_awake.map(f64::round_ties_even),
            })
            .collect()
    }
}
