//! Pre-trained regression models loaded from a JSON artifact.
//!
//! The artifact carries the ordered feature schema the model was trained on
//! and the fitted estimator:
//!
//! ```json
//! {
//!   "feature_names": ["indoor_temp", "weather_Clouds"],
//!   "estimator": {"kind": "linear", "intercept": 20.0, "coefficients": [0.1, -1.0]}
//! }
//! ```
//!
//! Shape problems are caught at load time so inference itself cannot index
//! out of bounds.

pub mod forest;
pub mod linear;

use crate::error::{Result, SetpointError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use forest::{Forest, RegressionTree};
pub use linear::LinearModel;

/// Single-row inference over a fixed feature schema.
pub trait Regressor {
    /// Ordered column names the model expects.
    fn feature_names(&self) -> &[String];

    /// Predict one row. `row` must have one value per feature name.
    fn predict_one(&self, row: &[f64]) -> Result<f64>;
}

/// Fitted estimator variants understood by the loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearModel),
    Forest(Forest),
}

#[derive(Deserialize)]
struct Artifact {
    feature_names: Vec<String>,
    estimator: Estimator,
}

/// A loaded, validated model artifact.
#[derive(Debug, Clone)]
pub struct Model {
    feature_names: Vec<String>,
    estimator: Estimator,
}

impl Model {
    /// Read and validate an artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| artifact_error(path, e))?;
        Self::from_json(&raw).map_err(|e| match e {
            SetpointError::ModelArtifact { reason, .. } => artifact_error(path, reason),
            other => other,
        })
    }

    /// Parse and validate an artifact from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let artifact: Artifact = serde_json::from_str(raw).map_err(inline_error)?;
        Self::new(artifact.feature_names, artifact.estimator)
    }

    pub fn new(feature_names: Vec<String>, estimator: Estimator) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(inline_error("feature_names is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(inline_error(format!("duplicate feature name {dup:?}")));
        }

        let width = feature_names.len();
        let shape = match &estimator {
            Estimator::Linear(linear) => linear.validate(width),
            Estimator::Forest(forest) => forest.validate(width),
        };
        shape.map_err(inline_error)?;

        Ok(Self {
            feature_names,
            estimator,
        })
    }
}

impl Regressor for Model {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_one(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.feature_names.len() {
            return Err(SetpointError::FeatureWidth {
                expected: self.feature_names.len(),
                actual: row.len(),
            });
        }
        Ok(match &self.estimator {
            Estimator::Linear(linear) => linear.predict(row),
            Estimator::Forest(forest) => forest.predict(row),
        })
    }
}

fn artifact_error(path: &Path, reason: impl ToString) -> SetpointError {
    SetpointError::ModelArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn inline_error(reason: impl ToString) -> SetpointError {
    artifact_error(&PathBuf::from("<inline>"), reason)
}
