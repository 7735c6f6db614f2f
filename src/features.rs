//! Feature derivation
//!
//! This module derives the fixed feature set from raw sensor samples:
//! - Hour of day from the normalized timestamp
//! - Absolute wrist angle
//! - Lagged differences, computed per series
//! - Centered rolling mean/max/std over the base channels and their differences

use crate::config::{PipelineConfig, WindowScope};
use crate::error::DetectError;
use crate::schema::SensorTable;
use crate::types::{FeatureRow, Features, RawSample};
use crate::window::{self, RollingStat};
use chrono::Timelike;
use half::f16;

/// Feature builder for turning raw samples into feature rows
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    diff_periods: usize,
    window: usize,
    scope: WindowScope,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl FeatureBuilder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            diff_periods: config.diff_periods,
            window: config.feature_window,
            scope: config.window_scope,
        }
    }

    /// Validate a table and derive its features
    pub fn build_table(&self, table: &SensorTable) -> Result<Vec<FeatureRow>, DetectError> {
        self.build(table.samples()?)
    }

    /// Derive features for samples of one or more series, in row order
    pub fn build(&self, samples: Vec<RawSample>) -> Result<Vec<FeatureRow>, DetectError> {
        if samples.is_empty() {
            return Err(DetectError::EmptyInput);
        }

        let groups = window::group_rows(samples.iter().map(|s| s.series_id.as_str()));

        let anglez: Vec<f64> = samples.iter().map(|s| s.anglez.abs()).collect();
        let enmo: Vec<f64> = samples.iter().map(|s| s.enmo).collect();

        let anglez_diff = quantize(&self.grouped_diff(&anglez, &groups));
        let enmo_diff = quantize(&self.grouped_diff(&enmo, &groups));
        let anglez_diff_wide = widen(&anglez_diff);
        let enmo_diff_wide = widen(&enmo_diff);

        let roll = |values: &[f64], stat: RollingStat| -> Vec<f16> {
            let rolled = match self.scope {
                WindowScope::Global => window::centered_filled(values, self.window, stat),
                WindowScope::PerSeries => {
                    window::centered_filled_grouped(values, &groups, self.window, stat)
                }
            };
            quantize(&rolled)
        };

        let anglez_rolling_mean = roll(&anglez, RollingStat::Mean);
        let anglez_rolling_max = roll(&anglez, RollingStat::Max);
        let anglez_rolling_std = roll(&anglez, RollingStat::Std);
        let enmo_rolling_mean = roll(&enmo, RollingStat::Mean);
        let enmo_rolling_max = roll(&enmo, RollingStat::Max);
        let enmo_rolling_std = roll(&enmo, RollingStat::Std);
        let anglez_diff_rolling_mean = roll(&anglez_diff_wide, RollingStat::Mean);
        let anglez_diff_rolling_max = roll(&anglez_diff_wide, RollingStat::Max);
        let enmo_diff_rolling_mean = roll(&enmo_diff_wide, RollingStat::Mean);
        let enmo_diff_rolling_max = roll(&enmo_diff_wide, RollingStat::Max);

        log::debug!(
            "derived features for {} rows across {} series",
            samples.len(),
            groups.len()
        );

        let rows = samples
            .into_iter()
            .enumerate()
            .map(|(i, sample)| {
                let features = Features {
                    hour: sample.timestamp.hour(),
                    anglez: anglez[i],
                    anglez_rolling_mean: anglez_rolling_mean[i],
                    anglez_rolling_max: anglez_rolling_max[i],
                    anglez_rolling_std: anglez_rolling_std[i],
                    anglez_diff: anglez_diff[i],
                    anglez_diff_rolling_mean: anglez_diff_rolling_mean[i],
                    anglez_diff_rolling_max: anglez_diff_rolling_max[i],
                    enmo: enmo[i],
                    enmo_rolling_mean: enmo_rolling_mean[i],
                    enmo_rolling_max: enmo_rolling_max[i],
                    enmo_rolling_std: enmo_rolling_std[i],
                    enmo_diff: enmo_diff[i],
                    enmo_diff_rolling_mean: enmo_diff_rolling_mean[i],
                    enmo_diff_rolling_max: enmo_diff_rolling_max[i],
                };
                FeatureRow { sample, features }
            })
            .collect();

        Ok(rows)
    }

    /// Lagged difference within each series. The leading gap is back-filled
    /// from the series' own first difference; a series too short to have any
    /// difference gets zeros.
    fn grouped_diff(&self, values: &[f64], groups: &[Vec<usize>]) -> Vec<f64> {
        let mut out = vec![0.0; values.len()];
        for rows in groups {
            let gathered: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
            let diffs = window::lagged_diff(&gathered, self.diff_periods);
            let filled = window::fill_both(diffs).unwrap_or_else(|| vec![0.0; rows.len()]);
            for (&i, d) in rows.iter().zip(filled) {
                out[i] = d;
            }
        }
        out
    }
}

fn quantize(values: &[f64]) -> Vec<f16> {
    values.iter().map(|&v| f16::from_f64(v)).collect()
}

fn widen(values: &[f16]) -> Vec<f64> {
    values.iter().map(|v| v.to_f64()).collect()
}
