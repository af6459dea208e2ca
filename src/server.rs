//! HTTP surface of the prediction service

use crate::backend::Backend;
use crate::error::{InputError, ServiceError};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::models::inference::{InferenceEngine, Prediction};
use crate::types::record::FeatureRecord;
use crate::types::response::{ErrorResponse, PredictionResponse};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared, read-only handler state
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(backend: Backend, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            backend: Arc::new(backend),
            metrics,
        }
    }
}

/// Build the router with permissive CORS
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(cors)
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::BackendUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::backend_not_loaded()),
            )
                .into_response(),
            other => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::prediction_failed(other.to_string())),
            )
                .into_response(),
        }
    }
}

/// `POST /predict`. The body is read as raw bytes so any content type is
/// accepted and malformed JSON maps onto the uniform 400 body. A body that
/// cannot be read at all (e.g. over the 2 MB default limit) is handed to
/// the handler too, so it gets the same 500/400 bodies as everything else.
async fn predict(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4();

    let result = match state.backend.as_ref() {
        Backend::Loaded(engine) => run_prediction(engine, body),
        Backend::Unloaded { cause } => Err(ServiceError::BackendUnavailable(cause.clone())),
    };
    let processing_time = start_time.elapsed();

    match result {
        Ok(prediction) => {
            state.metrics.record_success(processing_time, prediction.class);
            debug!(
                request_id = %request_id,
                prediction_class = prediction.class.as_u8(),
                processing_time_us = processing_time.as_micros(),
                "Prediction served"
            );
            Ok(Json(PredictionResponse::from(prediction.class)))
        }
        Err(e) => {
            state.metrics.record_failure(processing_time, e.kind());
            warn!(
                request_id = %request_id,
                kind = e.kind().as_str(),
                error = %e,
                "Prediction request failed"
            );
            Err(e)
        }
    }
}

fn run_prediction(
    engine: &InferenceEngine,
    body: Result<Bytes, BytesRejection>,
) -> Result<Prediction, ServiceError> {
    let body = body.map_err(|e| InputError::UnreadableBody(e.body_text()))?;
    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| InputError::InvalidJson(e.to_string()))?;
    let record = FeatureRecord::from_json(&payload)?;
    engine.predict(&record)
}

/// `GET /health`
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.backend.as_ref() {
        Backend::Loaded(engine) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "model": engine.model_name() })),
        ),
        Backend::Unloaded { cause } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "error": cause })),
        ),
    }
}

/// `GET /metrics`
async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactsConfig;
    use crate::error::ErrorKind;
    use crate::types::record::FeatureColumn;
    use crate::types::response::{BACKEND_NOT_LOADED, PREDICTION_FAILED, SUCCESS_MESSAGE};
    use axum::body::Body;
    use axum::http::{header, Request};
    use std::path::Path;
    use tower::ServiceExt;

    fn loaded_state() -> AppState {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let backend = Backend::load(&ArtifactsConfig {
            model_path: dir.join("forest_model.json").display().to_string(),
            scaler_path: dir.join("scaler.json").display().to_string(),
            onnx_threads: 1,
        });
        assert!(backend.is_loaded());
        AppState::new(backend, Arc::new(ServiceMetrics::new()))
    }

    fn unloaded_state() -> AppState {
        let backend = Backend::Unloaded {
            cause: "Model file not found: models/diabetes_model.onnx".to_string(),
        };
        AppState::new(backend, Arc::new(ServiceMetrics::new()))
    }

    fn example() -> Value {
        json!({
            "Pregnancies": 2,
            "Glucose": 120,
            "BloodPressure": 70,
            "SkinThickness": 30,
            "Insulin": 80,
            "BMI": 25.5,
            "DiabetesPedigreeFunction": 0.5,
            "Age": 33
        })
    }

    async fn post_predict(state: AppState, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();
        send(state, request).await
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_example_request_is_low_risk() {
        let (status, body) = post_predict(loaded_state(), example().to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction_class"], 0);
        assert_eq!(body["outcome_text"], "Negative (Low Risk of Diabetes)");
        assert_eq!(body["message"], SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_high_risk_request_with_numeric_strings() {
        let body = json!({
            "Pregnancies": "6",
            "Glucose": "180",
            "BloodPressure": "85",
            "SkinThickness": "40",
            "Insulin": "300",
            "BMI": "35.0",
            "DiabetesPedigreeFunction": "1.2",
            "Age": "50"
        });
        let (status, body) = post_predict(loaded_state(), body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction_class"], 1);
        assert_eq!(body["outcome_text"], "Positive (High Risk of Diabetes)");
    }

    #[tokio::test]
    async fn test_identical_requests_give_identical_responses() {
        let state = loaded_state();
        let first = post_predict(state.clone(), example().to_string()).await;
        let second = post_predict(state, example().to_string()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_each_missing_key_is_rejected() {
        let state = loaded_state();
        for column in FeatureColumn::ALL {
            let key = column.name();
            let mut body = example();
            body.as_object_mut().unwrap().remove(key);

            let (status, body) = post_predict(state.clone(), body.to_string()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], PREDICTION_FAILED);
            let details = body["details"].as_str().unwrap();
            assert!(details.contains(key), "details {:?} should name {}", details, key);
        }
        assert_eq!(
            state.metrics.failures(ErrorKind::Input),
            FeatureColumn::COUNT as u64
        );
    }

    #[tokio::test]
    async fn test_non_numeric_string_is_rejected() {
        let mut body = example();
        body["Glucose"] = json!("abc");

        let (status, body) = post_predict(loaded_state(), body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], PREDICTION_FAILED);
        assert!(!body["details"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_and_non_object_bodies_are_rejected() {
        let (status, body) = post_predict(loaded_state(), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("not valid JSON"));

        let (status, _) = post_predict(loaded_state(), "[1, 2, 3]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_negative_skewed_value_is_rejected() {
        let mut body = example();
        body["Insulin"] = json!(-5);

        let (status, body) = post_predict(loaded_state(), body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"].as_str().unwrap().contains("non-finite"));
    }

    #[tokio::test]
    async fn test_extra_keys_do_not_change_result() {
        let state = loaded_state();
        let mut with_extra = example();
        with_extra["Outcome"] = json!("whatever");
        with_extra["Notes"] = json!({"nested": true});

        let plain = post_predict(state.clone(), example().to_string()).await;
        let extra = post_predict(state, with_extra.to_string()).await;
        assert_eq!(plain, extra);
    }

    #[tokio::test]
    async fn test_unloaded_backend_returns_500_for_any_payload() {
        let state = unloaded_state();
        for body in [example().to_string(), "garbage".to_string(), String::new()] {
            let (status, body) = post_predict(state.clone(), body).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, json!({ "error": BACKEND_NOT_LOADED }));
        }
        assert_eq!(state.metrics.failures(ErrorKind::BackendUnavailable), 3);
    }

    #[tokio::test]
    async fn test_oversized_body_gets_uniform_error_bodies() {
        let oversized = || vec![b' '; 3 * 1024 * 1024];

        let state = loaded_state();
        let (status, body) = post_predict(state.clone(), oversized()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], PREDICTION_FAILED);
        assert!(body["details"].as_str().unwrap().contains("could not be read"));
        assert_eq!(state.metrics.failures(ErrorKind::Input), 1);

        let (status, body) = post_predict(unloaded_state(), oversized()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": BACKEND_NOT_LOADED }));
    }

    #[tokio::test]
    async fn test_health_reports_backend_state() {
        let request = || Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(loaded_state(), request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "forest_model");

        let (status, body) = send(unloaded_state(), request()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn test_metrics_count_requests() {
        let state = loaded_state();
        post_predict(state.clone(), example().to_string()).await;
        post_predict(state.clone(), "{}").await;

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests"], 2);
        assert_eq!(body["successes"], 1);
        assert_eq!(body["failures"]["input"], 1);
        assert_eq!(body["predictions"]["negative"], 1);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:8080")
            .body(Body::from(example().to_string()))
            .unwrap();
        let response = router(loaded_state()).oneshot(request).await.unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
