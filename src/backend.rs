//! Startup outcome of artifact loading.
//!
//! Computed once before the listener starts and shared read-only with every
//! request; there is no transition between the two states afterwards.

use crate::config::ArtifactsConfig;
use crate::models::inference::InferenceEngine;
use tracing::{error, info};

/// Either a ready inference engine or the reason it could not be built
pub enum Backend {
    Loaded(InferenceEngine),
    Unloaded { cause: String },
}

impl Backend {
    /// Load both artifacts; any failure leaves the service degraded
    pub fn load(config: &ArtifactsConfig) -> Self {
        info!(
            model_path = %config.model_path,
            scaler_path = %config.scaler_path,
            "Loading model artifacts"
        );

        match InferenceEngine::load(config) {
            Ok(engine) => {
                info!(model = %engine.model_name(), "ML model and scaler loaded successfully");
                Backend::Loaded(engine)
            }
            Err(e) => {
                let cause = format!("{:#}", e);
                error!(error = %cause, "Error loading required files, serving in degraded mode");
                Backend::Unloaded { cause }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Backend::Loaded(_))
    }

    pub fn engine(&self) -> Option<&InferenceEngine> {
        match self {
            Backend::Loaded(engine) => Some(engine),
            Backend::Unloaded { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_leave_backend_unloaded() {
        let backend = Backend::load(&ArtifactsConfig {
            model_path: "/nonexistent/diabetes_model.onnx".to_string(),
            scaler_path: "/nonexistent/scaler.json".to_string(),
            onnx_threads: 1,
        });

        assert!(!backend.is_loaded());
        assert!(backend.engine().is_none());
        match backend {
            Backend::Unloaded { cause } => assert!(cause.contains("Model file not found")),
            Backend::Loaded(_) => panic!("expected unloaded backend"),
        }
    }

    #[test]
    fn test_fixture_files_load() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let backend = Backend::load(&ArtifactsConfig {
            model_path: dir.join("forest_model.json").display().to_string(),
            scaler_path: dir.join("scaler.json").display().to_string(),
            onnx_threads: 1,
        });

        assert!(backend.is_loaded());
        assert_eq!(backend.engine().unwrap().model_name(), "forest_model");
    }

    #[test]
    fn test_corrupt_onnx_leaves_backend_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("diabetes_model.onnx");
        std::fs::write(&model_path, b"\x08\x07garbage").unwrap();
        let fixtures = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

        let backend = Backend::load(&ArtifactsConfig {
            model_path: model_path.display().to_string(),
            scaler_path: fixtures.join("scaler.json").display().to_string(),
            onnx_threads: 1,
        });

        match backend {
            Backend::Unloaded { cause } => assert!(cause.contains("Failed to load model")),
            Backend::Loaded(_) => panic!("expected unloaded backend"),
        }
    }

    #[test]
    fn test_onnx_fixture_loads() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let backend = Backend::load(&ArtifactsConfig {
            model_path: dir.join("forest_model.onnx").display().to_string(),
            scaler_path: dir.join("scaler.json").display().to_string(),
            onnx_threads: 1,
        });

        assert!(backend.is_loaded());
        assert_eq!(backend.engine().unwrap().model_name(), "forest_model");
    }
}
