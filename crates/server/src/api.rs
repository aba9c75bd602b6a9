//! HTTP API: health, predict and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use inference_lib::{ErrorResponse, PredictionError, PredictionService};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self { service }
    }
}

/// Request-boundary error rendered as `400 {"error": ...}`
pub struct ApiError(pub PredictionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Expected feature contract
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.health())
}

/// Score a JSON object, or the first object of a JSON array.
///
/// The body is parsed regardless of content type.
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            let err = PredictionError::InvalidRequestFormat;
            state.service.record_rejection(&err);
            return Err(ApiError(err));
        }
    };

    let response = state.service.predict(&payload).map_err(ApiError)?;
    Ok(Json(response))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
