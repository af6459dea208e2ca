//! Request-time error taxonomy.
//!
//! Startup failures are carried as `anyhow` errors and end up in
//! [`Backend::Unloaded`](crate::backend::Backend); everything that can go
//! wrong while serving a single request is one of the enums below.

use crate::types::record::FeatureColumn;
use thiserror::Error;

/// The request body could not be turned into a feature record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    #[error("request body could not be read: {0}")]
    UnreadableBody(String),
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("missing required feature '{0}'")]
    MissingFeature(FeatureColumn),
    #[error("could not convert value {value:?} of feature '{column}' to a number")]
    NotNumeric { column: FeatureColumn, value: String },
    #[error("feature '{column}' must be a number or numeric string, got {kind}")]
    UnsupportedType {
        column: FeatureColumn,
        kind: &'static str,
    },
}

/// The preprocessing pipeline could not transform a record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PreprocessingError {
    #[error("scaler expects {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// The classifier rejected its input or failed to produce a class.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("input contains a non-finite value ({value}) for feature '{column}'")]
    NonFinite { column: &'static str, value: f64 },
    #[error("model produced unexpected class label {0}")]
    UnexpectedClass(i64),
    #[error("model inference failed: {0}")]
    Inference(String),
}

/// Any failure while handling a prediction request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("backend not loaded: {0}")]
    BackendUnavailable(String),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ServiceError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            ServiceError::Input(_) => ErrorKind::Input,
            ServiceError::Preprocessing(_) => ErrorKind::Preprocessing,
            ServiceError::Model(_) => ErrorKind::Model,
        }
    }
}

/// Failure category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BackendUnavailable,
    Input,
    Preprocessing,
    Model,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::BackendUnavailable,
        ErrorKind::Input,
        ErrorKind::Preprocessing,
        ErrorKind::Model,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::Input => "input",
            ErrorKind::Preprocessing => "preprocessing",
            ErrorKind::Model => "model",
        }
    }
}
