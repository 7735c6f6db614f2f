//! JSON model artifacts

use super::{Classifier, ForestClassifier, LogisticClassifier};
use crate::error::DetectError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Serialized classifier, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Forest(ForestClassifier),
    Logistic(LogisticClassifier),
}

impl ModelArtifact {
    /// Parse and validate an artifact. Any failure means the model is unavailable.
    pub fn from_json(json: &str) -> Result<Self, DetectError> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| DetectError::ModelUnavailable(format!("invalid model artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DetectError::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact = Self::from_json(&json)?;
        log::info!(
            "loaded {} model from {} ({} features)",
            artifact.kind(),
            path.display(),
            artifact.feature_count()
        );
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        let result = match self {
            ModelArtifact::Forest(forest) => forest.validate(),
            ModelArtifact::Logistic(logistic) => logistic.validate(),
        };
        result.map_err(DetectError::ModelUnavailable)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Forest(_) => "forest",
            ModelArtifact::Logistic(_) => "logistic",
        }
    }

    pub fn feature_count(&self) -> usize {
        match self {
            ModelArtifact::Forest(forest) => forest.feature_names.len(),
            ModelArtifact::Logistic(logistic) => logistic.feature_names.len(),
        }
    }

    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        match self {
            ModelArtifact::Forest(forest) => Arc::new(forest),
            ModelArtifact::Logistic(logistic) => Arc::new(logistic),
        }
    }
}

/// Load an artifact from disk into a shareable classifier
pub fn load_classifier(path: impl AsRef<Path>) -> Result<Arc<dyn Classifier>, DetectError> {
    Ok(ModelArtifact::load(path)?.into_classifier())
}
