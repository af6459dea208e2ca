//! Fitted min-max scaler for the scaled column subset

use crate::error::PreprocessingError;
use crate::types::record::FeatureColumn;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// On-disk form of a fitted min-max scaler.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerArtifact {
    /// Column names the scaler was fitted on, if recorded
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Per-column minimum seen during fitting
    pub data_min: Vec<f64>,
    /// Per-column maximum seen during fitting
    pub data_max: Vec<f64>,
    /// Target range of the transform
    #[serde(default = "default_feature_range")]
    pub feature_range: [f64; 2],
}

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

/// Min-max scaler with precomputed `scale` and `offset` per column.
///
/// `transform(x) = x * scale + offset`, no clipping.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl MinMaxScaler {
    /// Build a scaler from fitted statistics.
    ///
    /// A column with zero range gets a scale of 1 so constant training
    /// columns map onto the lower bound instead of dividing by zero.
    pub fn from_artifact(artifact: &ScalerArtifact) -> Result<Self> {
        let columns = FeatureColumn::SCALED.len();
        if artifact.data_min.len() != columns || artifact.data_max.len() != columns {
            bail!(
                "scaler must be fitted on {} columns, got data_min={} data_max={}",
                columns,
                artifact.data_min.len(),
                artifact.data_max.len()
            );
        }

        if let Some(names) = &artifact.feature_names {
            let expected: Vec<&str> = FeatureColumn::SCALED.iter().map(|c| c.name()).collect();
            if names.iter().map(String::as_str).ne(expected.iter().copied()) {
                bail!(
                    "scaler was fitted on columns {:?}, expected {:?}",
                    names,
                    expected
                );
            }
        }

        let [low, high] = artifact.feature_range;
        if !(low < high) {
            bail!("invalid feature_range [{}, {}]", low, high);
        }

        let mut scale = Vec::with_capacity(columns);
        let mut offset = Vec::with_capacity(columns);
        for (&min, &max) in artifact.data_min.iter().zip(&artifact.data_max) {
            if !min.is_finite() || !max.is_finite() || max < min {
                bail!("invalid fitted range [{}, {}]", min, max);
            }
            let range = if max - min == 0.0 { 1.0 } else { max - min };
            let s = (high - low) / range;
            scale.push(s);
            offset.push(low - min * s);
        }

        Ok(Self { scale, offset })
    }

    /// Load a scaler from a JSON artifact file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler from {}", path.display()))?;
        let artifact: ScalerArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse scaler artifact {}", path.display()))?;
        Self::from_artifact(&artifact)
            .with_context(|| format!("Invalid scaler artifact {}", path.display()))
    }

    /// Number of columns this scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.scale.len()
    }

    /// Scale one row in place.
    pub fn transform(&self, row: &mut [f64]) -> Result<(), PreprocessingError> {
        if row.len() != self.scale.len() {
            return Err(PreprocessingError::ShapeMismatch {
                expected: self.scale.len(),
                actual: row.len(),
            });
        }
        for ((value, scale), offset) in row.iter_mut().zip(&self.scale).zip(&self.offset) {
            *value = *value * scale + offset;
        }
        Ok(())
    }
}
