//! Pipeline orchestration
//!
//! This module provides the public API for sleepwake-flux.
//! It orchestrates the full pipeline from a raw sensor table to per-step events.

use crate::classifier::{Classifier, FeatureMatrix};
use crate::config::PipelineConfig;
use crate::encoder::EventEncoder;
use crate::error::DetectError;
use crate::features::FeatureBuilder;
use crate::schema::SensorTable;
use crate::segmenter::EventSegmenter;
use crate::smoother::Smoother;
use crate::types::{Event, FeatureRow, PredictionRow};
use std::sync::Arc;

/// Detect sleep/wake events for every row of a sensor table.
///
/// # Arguments
/// * `table` - Sensor readings for one or more series, in row order
/// * `classifier` - Loaded sleep/awake model
///
/// # Returns
/// One event per input row, in input order
///
/// # Example
/// ```ignore
/// let classifier = load_classifier("model.json")?;
/// let events = detect_events(&table, classifier)?;
/// ```
pub fn detect_events(
    table: &SensorTable,
    classifier: Arc<dyn Classifier>,
) -> Result<Vec<Event>, DetectError> {
    SleepPipeline::new(classifier).run(table)
}

/// Detect events from a JSON array of row records and return the event
/// table as a JSON array of records.
///
/// # Arguments
/// * `records_json` - `[{"series_id": ..., "step": ..., "timestamp": ..., "anglez": ..., "enmo": ...}]`
/// * `classifier` - Loaded sleep/awake model
pub fn detect_events_json(
    records_json: &str,
    classifier: Arc<dyn Classifier>,
) -> Result<String, DetectError> {
    let table = SensorTable::from_records_json(records_json)?;
    let events = detect_events(&table, classifier)?;
    EventEncoder::new().encode_to_json(&events)
}

/// Reusable pipeline bound to one classifier and configuration.
///
/// The classifier is shared read-only, so a pipeline can be cloned across
/// threads and invoked concurrently.
#[derive(Clone)]
pub struct SleepPipeline {
    classifier: Arc<dyn Classifier>,
    config: PipelineConfig,
}

impl SleepPipeline {
    /// Create a pipeline with default settings
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            config: PipelineConfig::default(),
        }
    }

    /// Create a pipeline with explicit settings
    pub fn with_config(
        classifier: Arc<dyn Classifier>,
        config: PipelineConfig,
    ) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(Self { classifier, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate the table and derive its feature rows
    pub fn features(&self, table: &SensorTable) -> Result<Vec<FeatureRow>, DetectError> {
        FeatureBuilder::new(&self.config).build_table(table)
    }

    /// Run the pipeline and project to `(series_id, step, event)`
    pub fn run(&self, table: &SensorTable) -> Result<Vec<Event>, DetectError> {
        let predictions = self.run_detailed(table)?;
        Ok(predictions.iter().map(Event::from).collect())
    }

    /// Run the pipeline keeping features, probabilities and smoothing state.
    ///
    /// Pipeline stages:
    /// 1. FeatureBuilder - Validate input and derive features
    /// 2. Classifier - Per-row (not_awake, awake) probabilities
    /// 3. Smoother - Rolling mean and rounding
    /// 4. EventSegmenter - Run-length labelling
    pub fn run_detailed(&self, table: &SensorTable) -> Result<Vec<PredictionRow>, DetectError> {
        // Stage 1: Derive features
        let rows = self.features(table)?;

        // Stage 2: Classify
        let matrix = FeatureMatrix::from_rows(&rows, &self.classifier.feature_names())?;
        let probabilities = self.classifier.predict_proba(&matrix)?;
        if probabilities.len() != rows.len() {
            return Err(DetectError::PredictionShape {
                expected: rows.len(),
                actual: probabilities.len(),
            });
        }
        log::debug!("classified {} rows on {} features", rows.len(), matrix.n_cols());

        // Stage 3: Smooth
        let smoothed = Smoother::new(&self.config).smooth(
            rows.iter().map(|r| r.sample.series_id.as_str()),
            &probabilities,
        );

        // Stage 4: Segment
        let events = EventSegmenter::new().segment(
            rows.iter()
                .zip(&smoothed)
                .map(|(r, s)| (r.sample.series_id.as_str(), s.smooth)),
        );

        let predictions: Vec<PredictionRow> = rows
            .into_iter()
            .zip(probabilities)
            .zip(smoothed)
            .zip(events)
            .map(|(((row, [not_awake, awake]), smoothed), event)| PredictionRow {
                row,
                not_awake,
                awake,
                score: smoothed.score,
                smooth: smoothed.smooth,
                event,
            })
            .collect();

        log::info!("detected events for {} rows", predictions.len());
        Ok(predictions)
    }
}
