//! Integration tests for the risk server API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use inference_lib::{
    ArtifactPaths, ArtifactStore, PredictionService, StructuredLogger, DEFAULT_FEATURES,
};
use risk_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Write a JSON artifact set: identity scaler, logistic model keyed on
/// vehicle damage, no calibration data.
fn write_artifacts(dir: &TempDir) -> ArtifactPaths {
    let paths = ArtifactPaths {
        model: dir.path().join("model.json"),
        ..ArtifactPaths::in_dir(dir.path())
    };
    let n = DEFAULT_FEATURES.len();

    let scaler = json!({
        "kind": "standard",
        "mean": vec![0.0; n],
        "scale": vec![1.0; n],
    });
    std::fs::write(&paths.scaler, scaler.to_string()).unwrap();

    let mut weights = vec![0.0; n];
    let damage = DEFAULT_FEATURES
        .iter()
        .position(|f| *f == "Vehicle_Damage_Encoding")
        .unwrap();
    weights[damage] = 4.0;
    let model = json!({ "weights": weights, "intercept": -6.0 });
    std::fs::write(&paths.model, model.to_string()).unwrap();

    paths
}

fn setup_test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let paths = write_artifacts(&dir);

    let store = ArtifactStore::load(&paths).unwrap();
    let service = PredictionService::new(store, StructuredLogger::new("api-test"));
    let router = create_router(Arc::new(AppState::new(service)));

    (router, dir)
}

async fn post_predict(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_lists_expected_features() {
    let (app, _dir) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "ok");
    assert_eq!(health["features_expected"], json!(DEFAULT_FEATURES));
}

#[tokio::test]
async fn test_predict_single_record() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(
        app,
        json!({"Vehicle_Damage_Encoding": 1, "Age_log": 3.5}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "YES");
    assert_eq!(body["probability"], 0.12);
    assert_eq!(body["used_features"], json!(DEFAULT_FEATURES));
}

#[tokio::test]
async fn test_predict_low_risk_is_no() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(app, json!({"Vehicle_Damage_Encoding": 0}).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "NO");
    assert_eq!(body["probability"], 0.0);
}

#[tokio::test]
async fn test_predict_array_returns_first_record_only() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(
        app,
        json!([{"Vehicle_Damage_Encoding": 1}, {"Vehicle_Damage_Encoding": 0}]).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_object());
    assert_eq!(body["prediction"], "YES");
    assert_eq!(body["probability"], 0.12);
}

#[tokio::test]
async fn test_predict_rejects_bare_string() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(app, "\"not-json-object-or-array\"").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON format"}));
}

#[tokio::test]
async fn test_predict_rejects_malformed_body() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(app, "{\"Age_log\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON format");
}

#[tokio::test]
async fn test_predict_empty_array_is_processing_error() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(app, "[]").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Processing error: "));
}

#[tokio::test]
async fn test_non_numeric_value_is_coerced_not_rejected() {
    let (app, _dir) = setup_test_app();

    let (garbage_status, garbage) =
        post_predict(app.clone(), json!({"Vehicle_Damage_Encoding": "abc"}).to_string()).await;
    let (_, zero) = post_predict(app, json!({"Vehicle_Damage_Encoding": 0}).to_string()).await;

    assert_eq!(garbage_status, StatusCode::OK);
    assert_eq!(garbage, zero);
}

#[tokio::test]
async fn test_empty_object_is_deterministic() {
    let (app, _dir) = setup_test_app();

    let (status, first) = post_predict(app.clone(), "{}").await;
    let (_, second) = post_predict(app, "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_fields_are_ignored() {
    let (app, _dir) = setup_test_app();

    let (status, body) = post_predict(
        app,
        json!({"Vehicle_Damage_Encoding": 1, "Favourite_Colour": "blue"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let used: Vec<&str> = body["used_features"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(!used.contains(&"Favourite_Colour"));
}

#[tokio::test]
async fn test_probability_has_two_decimals_and_matches_label() {
    let (app, _dir) = setup_test_app();

    for damage in [0.0, 0.5, 0.9, 1.0, 1.7] {
        let (_, body) = post_predict(
            app.clone(),
            json!({"Vehicle_Damage_Encoding": damage}).to_string(),
        )
        .await;

        let probability = body["probability"].as_f64().unwrap();
        assert_eq!((probability * 100.0).round() / 100.0, probability);

        let expected = if probability >= 0.01 { "YES" } else { "NO" };
        assert_eq!(body["prediction"], expected);
    }
}

#[tokio::test]
async fn test_predict_requires_post() {
    let (app, _dir) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/predict")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _dir) = setup_test_app();

    let (status, _) = post_predict(app.clone(), "{}").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_predict(app.clone(), "42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("risk_inference_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("risk_inference_predictions_total"));
    assert!(metrics_text.contains("risk_inference_prediction_errors_total"));
    assert!(metrics_text.contains("risk_inference_model_info"));
}
