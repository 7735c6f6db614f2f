//! Logistic-regression classifier

use super::{default_feature_names, Classifier, FeatureMatrix, Probabilities};
use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// Linear model with a sigmoid link; the positive class is "awake"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    #[serde(default = "default_feature_names")]
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

impl LogisticClassifier {
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.len() != self.feature_names.len() {
            return Err(format!(
                "{} weights for {} features",
                self.weights.len(),
                self.feature_names.len()
            ));
        }
        if self.weights.iter().chain([&self.bias]).any(|w| !w.is_finite()) {
            return Err("weights must be finite".to_string());
        }
        Ok(())
    }

    fn awake_probability(&self, row: &[f32]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, x)| w * f64::from(*x))
            .sum::<f64>()
            + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

impl Classifier for LogisticClassifier {
    fn feature_names(&self) -> Vec<String> {
        self.feature_names.clone()
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Probabilities, DetectError> {
        if features.n_cols() != self.weights.len() {
            return Err(DetectError::Internal(format!(
                "matrix has {} columns, model has {} weights",
                features.n_cols(),
                self.weights.len()
            )));
        }
        Ok(features
            .iter_rows()
            .map(|row| {
                let awake = self.awake_probability(row);
                [1.0 - awake, awake]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LogisticClassifier {
        LogisticClassifier {
            feature_names: vec!["enmo".to_string()],
            weights: vec![40.0],
            bias: -2.0,
        }
    }

    #[test]
    fn test_sigmoid_output() {
        let matrix = FeatureMatrix::new(vec!["enmo".to_string()], vec![0.05, 0.0, 1.0]).unwrap();
        let proba = model().predict_proba(&matrix).unwrap();

        // z = 40 * 0.05 - 2 = 0 (up to f32 rounding of 0.05)
        assert!((proba[0][1] - 0.5).abs() < 1e-6);
        assert!(proba[1][1] < 0.5);
        assert!(proba[2][1] > 0.99);
        for [p0, p1] in proba {
            assert!((p0 + p1 - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_validation() {
        assert!(model().validate().is_ok());

        let mut bad = model();
        bad.weights.push(1.0);
        assert!(bad.validate().is_err());

        let mut bad = model();
        bad.bias = f64::NAN;
        assert!(bad.validate().is_err());
    }
}
