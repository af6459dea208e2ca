//! Type definitions for the prediction service

pub mod record;
pub mod response;

pub use record::{FeatureColumn, FeatureRecord};
pub use response::{ErrorResponse, PredictionClass, PredictionResponse};
