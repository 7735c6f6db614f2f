//! Pipeline configuration

use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// Lag (in steps) for the `*_diff` features
pub const DEFAULT_DIFF_PERIODS: usize = 20;

/// Width of the rolling windows behind the feature statistics
pub const DEFAULT_FEATURE_WINDOW: usize = 20;

/// Width of the rolling mean applied to classifier probabilities
pub const DEFAULT_SMOOTHING_WINDOW: usize = 2 * 230;

/// Which rows a rolling window may span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowScope {
    /// Windows run over the concatenated table and may cross series boundaries
    #[default]
    Global,
    /// Windows restart at every series
    PerSeries,
}

/// Tunables for feature derivation and smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub diff_periods: usize,
    pub feature_window: usize,
    pub smoothing_window: usize,
    /// Applies to the rolling feature statistics and the probability smoothing;
    /// lagged differences are always computed per series.
    pub window_scope: WindowScope,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            diff_periods: DEFAULT_DIFF_PERIODS,
            feature_window: DEFAULT_FEATURE_WINDOW,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            window_scope: WindowScope::Global,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, DetectError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_smoothing_window(mut self, width: usize) -> Self {
        self.smoothing_window = width;
        self
    }

    pub fn with_feature_window(mut self, width: usize) -> Self {
        self.feature_window = width;
        self
    }

    pub fn with_window_scope(mut self, scope: WindowScope) -> Self {
        self.window_scope = scope;
        self
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if self.diff_periods == 0 {
            return Err(DetectError::InvalidConfig(
                "diff_periods must be at least 1".to_string(),
            ));
        }
        if self.feature_window < 2 {
            return Err(DetectError::InvalidConfig(
                "feature_window must be at least 2".to_string(),
            ));
        }
        if self.smoothing_window == 0 {
            return Err(DetectError::InvalidConfig(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
