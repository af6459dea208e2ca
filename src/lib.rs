//! Diabetes Risk Prediction Service Library
//!
//! Serves a trained binary classifier over HTTP, reproducing the
//! preprocessing of its training pipeline (log transform of the skewed
//! columns followed by min-max scaling) in fixed column order.

pub mod backend;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use backend::Backend;
pub use config::AppConfig;
pub use error::ServiceError;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use server::{router, AppState};
pub use types::{record::FeatureRecord, response::PredictionResponse};
