//! Inference engine: preprocessing, classification and label mapping

use crate::config::ArtifactsConfig;
use crate::error::ServiceError;
use crate::feature_extractor::FeatureExtractor;
use crate::models::loader::ArtifactLoader;
use crate::models::Classifier;
use crate::types::record::FeatureRecord;
use crate::types::response::PredictionClass;
use anyhow::Result;
use tracing::{debug, info};

/// Result of model inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub class: PredictionClass,
}

/// Loaded model plus the preprocessing it expects
pub struct InferenceEngine {
    extractor: FeatureExtractor,
    model: Box<dyn Classifier>,
}

impl InferenceEngine {
    /// Create an engine from already loaded parts
    pub fn new(extractor: FeatureExtractor, model: Box<dyn Classifier>) -> Self {
        Self { extractor, model }
    }

    /// Load both artifacts named in the configuration
    pub fn load(config: &ArtifactsConfig) -> Result<Self> {
        let loader = ArtifactLoader::with_threads(config.onnx_threads);
        let model = loader.load_model(&config.model_path)?;
        let extractor = FeatureExtractor::new(loader.load_scaler(&config.scaler_path)?);

        info!(
            model = %model.name(),
            features = extractor.feature_count(),
            "Inference engine initialized"
        );

        Ok(Self::new(extractor, model))
    }

    /// Name of the loaded model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run the full pipeline on one record
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, ServiceError> {
        let features = self.extractor.extract(record)?;
        let label = self.model.predict(&features)?;
        let class = PredictionClass::from_label(label)?;

        debug!(
            model = %self.model.name(),
            features = ?features,
            class = class.as_u8(),
            "Inference complete"
        );

        Ok(Prediction { class })
    }
}
