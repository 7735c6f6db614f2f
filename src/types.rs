//! Core types for the sleepwake-flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw sensor samples, feature rows, prediction rows, and events.

use chrono::NaiveDateTime;
use half::f16;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input columns every sensor table must carry
pub const REQUIRED_COLUMNS: [&str; 5] = ["series_id", "step", "timestamp", "anglez", "enmo"];

/// Engineered features in the order classifiers expect them
pub const FEATURE_NAMES: [&str; 15] = [
    "hour",
    "anglez",
    "anglez_rolling_mean",
    "anglez_rolling_max",
    "anglez_rolling_std",
    "anglez_diff",
    "anglez_diff_rolling_mean",
    "anglez_diff_rolling_max",
    "enmo",
    "enmo_rolling_mean",
    "enmo_rolling_max",
    "enmo_rolling_std",
    "enmo_diff",
    "enmo_diff_rolling_mean",
    "enmo_diff_rolling_max",
];

/// One sensor reading from a single recording series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Recording identifier; groups samples of one continuous session
    pub series_id: String,
    /// Position within the series
    pub step: i64,
    /// Wall-clock time with any offset dropped
    pub timestamp: NaiveDateTime,
    /// Wrist angle (degrees, signed)
    pub anglez: f64,
    /// Euclidean norm minus one (g), non-negative
    pub enmo: f64,
}

/// Engineered features for one step
///
/// Lagged differences and rolling statistics are kept at half precision,
/// which is the representation the classifiers were fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub hour: u32,
    /// Absolute wrist angle
    pub anglez: f64,
    #[serde(with = "f16_number")]
    pub anglez_rolling_mean: f16,
    #[serde(with = "f16_number")]
    pub anglez_rolling_max: f16,
    #[serde(with = "f16_number")]
    pub anglez_rolling_std: f16,
    #[serde(with = "f16_number")]
    pub anglez_diff: f16,
    #[serde(with = "f16_number")]
    pub anglez_diff_rolling_mean: f16,
    #[serde(with = "f16_number")]
    pub anglez_diff_rolling_max: f16,
    pub enmo: f64,
    #[serde(with = "f16_number")]
    pub enmo_rolling_mean: f16,
    #[serde(with = "f16_number")]
    pub enmo_rolling_max: f16,
    #[serde(with = "f16_number")]
    pub enmo_rolling_std: f16,
    #[serde(with = "f16_number")]
    pub enmo_diff: f16,
    #[serde(with = "f16_number")]
    pub enmo_diff_rolling_mean: f16,
    #[serde(with = "f16_number")]
    pub enmo_diff_rolling_max: f16,
}

impl Features {
    /// Look up a feature by name
    pub fn value(&self, name: &str) -> Option<f32> {
        let value = match name {
            "hour" => self.hour as f32,
            "anglez" => self.anglez as f32,
            "anglez_rolling_mean" => self.anglez_rolling_mean.to_f32(),
            "anglez_rolling_max" => self.anglez_rolling_max.to_f32(),
            "anglez_rolling_std" => self.anglez_rolling_std.to_f32(),
            "anglez_diff" => self.anglez_diff.to_f32(),
            "anglez_diff_rolling_mean" => self.anglez_diff_rolling_mean.to_f32(),
            "anglez_diff_rolling_max" => self.anglez_diff_rolling_max.to_f32(),
            "enmo" => self.enmo as f32,
            "enmo_rolling_mean" => self.enmo_rolling_mean.to_f32(),
            "enmo_rolling_max" => self.enmo_rolling_max.to_f32(),
            "enmo_rolling_std" => self.enmo_rolling_std.to_f32(),
            "enmo_diff" => self.enmo_diff.to_f32(),
            "enmo_diff_rolling_mean" => self.enmo_diff_rolling_mean.to_f32(),
            "enmo_diff_rolling_max" => self.enmo_diff_rolling_max.to_f32(),
            _ => return None,
        };
        Some(value)
    }
}

/// Half-precision values travel as plain JSON numbers
mod f16_number {
    use half::f16;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(value.to_f32())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f16, D::Error> {
        f32::deserialize(deserializer).map(f16::from_f32)
    }
}

/// A raw sample together with its engineered features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub sample: RawSample,
    pub features: Features,
}

/// Event kind attached to every step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Onset,
    Wakeup,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Onset => "onset",
            EventKind::Wakeup => "wakeup",
        }
    }

    /// Map a segmentation label (1 = boundary marker) to an event kind
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            EventKind::Wakeup
        } else {
            EventKind::Onset
        }
    }
}

/// Feature row plus classifier output and post-processing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    #[serde(flatten)]
    pub row: FeatureRow,
    /// Probability of the not-awake class
    pub not_awake: f64,
    /// Probability of the awake class
    pub awake: f64,
    /// Smoothed awake probability; null when the input is shorter than the
    /// smoothing window
    pub score: Option<f64>,
    /// Rounded smoothed not-awake probability (0 or 1); null as for `score`
    pub smooth: Option<f64>,
    pub event: EventKind,
}

/// One row of the output event table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub series_id: String,
    pub step: i64,
    pub event: EventKind,
}

impl From<&PredictionRow> for Event {
    fn from(row: &PredictionRow) -> Self {
        Event {
            series_id: row.row.sample.series_id.clone(),
            step: row.row.sample.step,
            event: row.event,
        }
    }
}

/// Label counts for one series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub rows: usize,
    pub onset: usize,
    pub wakeup: usize,
}

/// Per-series label counts over an event table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub series: BTreeMap<String, SeriesSummary>,
}

impl EventSummary {
    pub fn from_events(events: &[Event]) -> Self {
        let mut series: BTreeMap<String, SeriesSummary> = BTreeMap::new();
        for event in events {
            let entry = series.entry(event.series_id.clone()).or_default();
            entry.rows += 1;
            match event.event {
                EventKind::Onset => entry.onset += 1,
                EventKind::Wakeup => entry.wakeup += 1,
            }
        }
        Self { series }
    }

    pub fn total_rows(&self) -> usize {
        self.series.values().map(|s| s.rows).sum()
    }
}
