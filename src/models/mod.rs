//! ML model artifacts and inference

pub mod forest;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod scaler;

use crate::error::ModelError;

pub use forest::ForestClassifier;
pub use inference::InferenceEngine;
pub use loader::ArtifactLoader;
pub use onnx::OnnxClassifier;
pub use scaler::MinMaxScaler;

/// A trained classifier consuming one feature vector in canonical column
/// order and returning the raw class label.
pub trait Classifier: Send + Sync {
    /// Name used in logs and health output
    fn name(&self) -> &str;

    /// Predict the class label of a single row
    fn predict(&self, features: &[f64]) -> Result<i64, ModelError>;
}
