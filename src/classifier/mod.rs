//! Classifier capability
//!
//! The pipeline consumes a binary probabilistic model through the
//! [`Classifier`] trait. Models are loaded once, shared read-only behind an
//! `Arc`, and never trained here. [`ModelArtifact`] provides JSON-backed
//! implementations for the CLI and FFI surfaces.

mod artifact;
mod forest;
mod logistic;

pub use artifact::{load_classifier, ModelArtifact};
pub use forest::{DecisionTree, ForestClassifier, TreeNode};
pub use logistic::LogisticClassifier;

use crate::error::DetectError;
use crate::types::{FeatureRow, FEATURE_NAMES};

/// Per-row (not_awake, awake) probabilities
pub type Probabilities = Vec<[f64; 2]>;

/// Binary sleep/awake model
pub trait Classifier: Send + Sync {
    /// Feature columns the model expects, in order
    fn feature_names(&self) -> Vec<String> {
        default_feature_names()
    }

    /// Probability of (not_awake, awake) for every matrix row
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Probabilities, DetectError>;
}

pub(crate) fn default_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Dense row-major feature matrix in a classifier's column order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Vec<f32>,
    rows: usize,
}

impl FeatureMatrix {
    /// Select `columns` from feature rows. Fails with `MissingFeatures` when a
    /// requested column is not produced by the feature builder.
    pub fn from_rows(rows: &[FeatureRow], columns: &[String]) -> Result<Self, DetectError> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|name| !FEATURE_NAMES.contains(&name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DetectError::MissingFeatures(missing));
        }

        let mut values = Vec::with_capacity(rows.len() * columns.len());
        for row in rows {
            for name in columns {
                let value = row
                    .features
                    .value(name)
                    .ok_or_else(|| DetectError::MissingFeatures(vec![name.clone()]))?;
                values.push(value);
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            values,
            rows: rows.len(),
        })
    }

    /// Wrap row-major values laid out in `columns` order
    pub fn new(columns: Vec<String>, values: Vec<f32>) -> Result<Self, DetectError> {
        if columns.is_empty() || values.len() % columns.len() != 0 {
            return Err(DetectError::Internal(format!(
                "{} values do not fill rows of {} columns",
                values.len(),
                columns.len()
            )));
        }
        let rows = values.len() / columns.len();
        Ok(Self {
            columns,
            values,
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let width = self.columns.len();
        &self.values[index * width..(index + 1) * width]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureBuilder;
    use crate::types::RawSample;
    use chrono::NaiveDate;

    fn feature_rows(n: usize) -> Vec<FeatureRow> {
        let start = NaiveDate::from_ymd_opt(2018, 8, 14)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        let samples = (0..n)
            .map(|i| RawSample {
                series_id: "a".to_string(),
                step: i as i64,
                timestamp: start + chrono::Duration::seconds(5 * i as i64),
                anglez: -(i as f64),
                enmo: 0.5,
            })
            .collect();
        FeatureBuilder::default().build(samples).unwrap()
    }

    #[test]
    fn test_matrix_follows_requested_order() {
        let rows = feature_rows(4);
        let columns = vec!["enmo".to_string(), "hour".to_string(), "anglez".to_string()];
        let matrix = FeatureMatrix::from_rows(&rows, &columns).unwrap();

        assert_eq!(matrix.n_rows(), 4);
        assert_eq!(matrix.n_cols(), 3);
        assert_eq!(matrix.row(2), &[0.5, 3.0, 2.0]);
        assert_eq!(matrix.iter_rows().count(), 4);
    }

    #[test]
    fn test_default_order_has_every_feature() {
        let rows = feature_rows(2);
        let matrix = FeatureMatrix::from_rows(&rows, &default_feature_names()).unwrap();
        assert_eq!(matrix.n_cols(), FEATURE_NAMES.len());
        assert_eq!(matrix.columns()[0], "hour");
    }

    #[test]
    fn test_unknown_feature_is_a_data_error() {
        let rows = feature_rows(2);
        let columns = vec!["hour".to_string(), "heart_rate".to_string()];
        match FeatureMatrix::from_rows(&rows, &columns) {
            Err(DetectError::MissingFeatures(names)) => assert_eq!(names, vec!["heart_rate"]),
            other => panic!("expected MissingFeatures, got {:?}", other),
        }
    }
}
