//! Prediction outcome and HTTP response bodies

use crate::error::ModelError;
use serde::Serialize;

/// Fixed success message of a prediction response.
pub const SUCCESS_MESSAGE: &str = "Prediction successful!";

/// Fixed error message of every failed prediction.
pub const PREDICTION_FAILED: &str = "Prediction failed due to bad input or server error.";

/// Fixed error message returned while the artifacts are not loaded.
pub const BACKEND_NOT_LOADED: &str = "Backend files not loaded. Check server logs.";

/// Binary classification produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionClass {
    Negative,
    Positive,
}

impl PredictionClass {
    /// Map a raw model label onto a class.
    pub fn from_label(label: i64) -> Result<Self, ModelError> {
        match label {
            0 => Ok(PredictionClass::Negative),
            1 => Ok(PredictionClass::Positive),
            other => Err(ModelError::UnexpectedClass(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            PredictionClass::Negative => 0,
            PredictionClass::Positive => 1,
        }
    }

    /// Human-readable label.
    pub fn outcome_text(self) -> &'static str {
        match self {
            PredictionClass::Positive => "Positive (High Risk of Diabetes)",
            PredictionClass::Negative => "Negative (Low Risk of Diabetes)",
        }
    }
}

/// Body of a successful `/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub prediction_class: u8,
    pub outcome_text: String,
    pub message: String,
}

impl From<PredictionClass> for PredictionResponse {
    fn from(class: PredictionClass) -> Self {
        Self {
            prediction_class: class.as_u8(),
            outcome_text: class.outcome_text().to_string(),
            message: SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// Body of a failed `/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Uniform body for any request-time failure.
    pub fn prediction_failed(details: impl Into<String>) -> Self {
        Self {
            error: PREDICTION_FAILED.to_string(),
            details: Some(details.into()),
        }
    }

    /// Body returned while the backend is degraded.
    pub fn backend_not_loaded() -> Self {
        Self {
            error: BACKEND_NOT_LOADED.to_string(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_labels() {
        assert_eq!(PredictionClass::from_label(1).unwrap(), PredictionClass::Positive);
        assert_eq!(PredictionClass::from_label(0).unwrap(), PredictionClass::Negative);
        assert_eq!(
            PredictionClass::from_label(2).unwrap_err(),
            ModelError::UnexpectedClass(2)
        );
        assert_eq!(
            PredictionClass::Positive.outcome_text(),
            "Positive (High Risk of Diabetes)"
        );
    }

    #[test]
    fn test_response_serialization() {
        let response = PredictionResponse::from(PredictionClass::Negative);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["prediction_class"], 0);
        assert_eq!(json["outcome_text"], "Negative (Low Risk of Diabetes)");
        assert_eq!(json["message"], "Prediction successful!");
    }

    #[test]
    fn test_backend_error_has_no_details() {
        let json = serde_json::to_value(ErrorResponse::backend_not_loaded()).unwrap();
        assert_eq!(json["error"], BACKEND_NOT_LOADED);
        assert!(json.get("details").is_none());
    }
}
