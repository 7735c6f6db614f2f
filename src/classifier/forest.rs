//! Decision-forest classifier
//!
//! Trees are stored as flat node arrays with the root at index 0. A split
//! sends a row left when `x[feature] <= threshold`. Leaves carry per-class
//! sample counts (not_awake, awake); the forest probability is the mean of
//! each tree's normalized leaf distribution.

use super::{default_feature_names, Classifier, FeatureMatrix, Probabilities};
use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// One node of a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: [f64; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Check node wiring. Children must sit after their parent, which rules
    /// out cycles.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            index, feature, n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", index));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", index, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    if value.iter().any(|v| *v < 0.0 || !v.is_finite()) || total <= 0.0 {
                        return Err(format!("leaf {} has invalid class counts", index));
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `row`. A walk
    /// longer than the node count means the wiring loops.
    pub fn predict(&self, row: &[f32]) -> Result<[f64; 2], DetectError> {
        let mut index = 0;
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().ok_or_else(|| {
                        DetectError::Internal(format!("feature {} out of range", feature))
                    })?;
                    index = if f64::from(value) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Some(TreeNode::Leaf { value }) => {
                    let total = value[0] + value[1];
                    return Ok([value[0] / total, value[1] / total]);
                }
                None => {
                    return Err(DetectError::Internal(format!("tree node {} missing", index)));
                }
            }
        }
        Err(DetectError::Internal("tree walk did not reach a leaf".to_string()))
    }
}

/// Averaging ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    #[serde(default = "default_feature_names")]
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestClassifier {
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn feature_names(&self) -> Vec<String> {
        self.feature_names.clone()
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Probabilities, DetectError> {
        let n_trees = self.trees.len() as f64;
        features
            .iter_rows()
            .map(|row| -> Result<[f64; 2], DetectError> {
                let mut sum = [0.0, 0.0];
                for tree in &self.trees {
                    let [p0, p1] = tree.predict(row)?;
                    sum[0] += p0;
                    sum[1] += p1;
                }
                Ok([sum[0] / n_trees, sum[1] / n_trees])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on `enmo` (column 1): low motion is asleep
    fn stump(threshold: f64, asleep: [f64; 2], awake: [f64; 2]) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 1,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: asleep },
                TreeNode::Leaf { value: awake },
            ],
        }
    }

    fn forest() -> ForestClassifier {
        ForestClassifier {
            feature_names: vec!["hour".to_string(), "enmo".to_string()],
            trees: vec![
                stump(0.05, [9.0, 1.0], [1.0, 3.0]),
                stump(0.10, [10.0, 0.0], [0.0, 10.0]),
            ],
        }
    }

    #[test]
    fn test_tree_routing() {
        let tree = stump(0.05, [9.0, 1.0], [1.0, 3.0]);
        assert_eq!(tree.predict(&[0.0, 0.04]).unwrap(), [0.9, 0.1]);
        assert_eq!(tree.predict(&[0.0, 0.2]).unwrap(), [0.25, 0.75]);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = forest();
        assert!(forest.validate().is_ok());

        let matrix = FeatureMatrix::new(
            forest.feature_names.clone(),
            vec![3.0, 0.07, 3.0, 0.5, 3.0, 0.01],
        )
        .unwrap();
        let proba = forest.predict_proba(&matrix).unwrap();

        // 0.07 is awake for the first stump, asleep for the second
        assert_eq!(proba[0], [0.625, 0.375]);
        assert_eq!(proba[1], [0.125, 0.875]);
        assert!((proba[2][0] - 0.95).abs() < 1e-12);
        assert!((proba[2][1] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_validation_catches_bad_wiring() {
        let mut tree = stump(0.05, [1.0, 0.0], [0.0, 1.0]);
        tree.nodes[0] = TreeNode::Split {
            feature: 1,
            threshold: 0.05,
            left: 0,
            right: 2,
        };
        assert!(tree.validate(2).is_err());

        let tree = stump(0.05, [0.0, 0.0], [0.0, 1.0]);
        assert!(tree.validate(2).is_err());

        let tree = stump(0.05, [1.0, 0.0], [0.0, 1.0]);
        assert!(tree.validate(1).is_err());

        let empty = ForestClassifier {
            feature_names: vec!["enmo".to_string()],
            trees: vec![],
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_looping_tree_fails_instead_of_hanging() {
        let mut tree = stump(0.05, [1.0, 0.0], [0.0, 1.0]);
        tree.nodes[0] = TreeNode::Split {
            feature: 1,
            threshold: 0.05,
            left: 0,
            right: 2,
        };

        let err = tree.predict(&[0.0, 0.01]).unwrap_err();
        assert!(matches!(err, DetectError::Internal(ref m) if m.contains("leaf")));
        assert_eq!(tree.predict(&[0.0, 0.2]).unwrap(), [0.0, 1.0]);
    }

    #[test]
    fn test_node_json_shapes() {
        let json = r#"{
            "feature_names": ["hour", "enmo"],
            "trees": [{"nodes": [
                {"feature": 1, "threshold": 0.05, "left": 1, "right": 2},
                {"value": [4.0, 0.0]},
                {"value": [0.0, 4.0]}
            ]}]
        }"#;
        let forest: ForestClassifier = serde_json::from_str(json).unwrap();
        assert!(forest.validate().is_ok());
        assert!(matches!(forest.trees[0].nodes[1], TreeNode::Leaf { .. }));
    }
}
