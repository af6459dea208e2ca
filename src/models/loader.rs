//! Artifact loader for the model and the scaler

use crate::models::forest::ForestClassifier;
use crate::models::onnx::OnnxClassifier;
use crate::models::scaler::MinMaxScaler;
use crate::models::Classifier;
use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

/// Supported model artifact formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// `.onnx` graph run with ONNX Runtime
    Onnx,
    /// `.json` decision forest evaluated in process
    Forest,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => Ok(ModelFormat::Onnx),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ModelFormat::Forest),
            _ => bail!(
                "unsupported model artifact {} (expected .onnx or .json)",
                path.display()
            ),
        }
    }
}

/// Loader for the persisted artifacts
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a new loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the classifier, dispatching on the artifact's extension
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn Classifier>> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Model file not found: {}", path.display());
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();

        let model: Box<dyn Classifier> = match ModelFormat::from_path(path)? {
            ModelFormat::Onnx => Box::new(OnnxClassifier::load(path, &name, self.onnx_threads)?),
            ModelFormat::Forest => {
                let forest = ForestClassifier::load(path, &name)?;
                info!(model = %name, trees = forest.tree_count(), "Forest model loaded");
                Box::new(forest)
            }
        };

        Ok(model)
    }

    /// Load the fitted scaler
    pub fn load_scaler<P: AsRef<Path>>(&self, path: P) -> Result<MinMaxScaler> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Scaler file not found: {}", path.display());
        }

        let scaler = MinMaxScaler::load(path)?;
        info!(path = %path.display(), columns = scaler.n_features(), "Scaler loaded");
        Ok(scaler)
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}
