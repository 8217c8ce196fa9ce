//! HTTP API for metric ingestion, forecast reports, health checks and
//! Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use forecast_lib::{
    forecast::{DOMAIN_MAX, DOMAIN_MIN},
    health::{ComponentStatus, HealthRegistry},
    observability::EngineMetrics,
    ConfigError, EngineRegistry, MetricSummary, Sample, TickReport,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub engines: Arc<EngineRegistry>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        engines: Arc<EngineRegistry>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            engines,
        }
    }
}

/// Errors returned by the forecast API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    #[error("no report for metric '{0}' yet")]
    NotFound(String),

    #[error("engine configuration rejected: {0}")]
    Engine(#[from] ConfigError),

    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidSample(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Engine(_) | ApiError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// One pushed sample; the timestamp defaults to the time of arrival
#[derive(Debug, Clone, Deserialize)]
pub struct SampleRequest {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
}

/// Historical series used to seed a metric's window
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRequest {
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub metric: String,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsListResponse {
    pub metrics: Vec<MetricSummary>,
}

/// Samples must be finite and inside the metric domain
pub fn validate_value(value: f64) -> Result<f64, ApiError> {
    if !value.is_finite() {
        return Err(ApiError::InvalidSample(format!("{value} is not finite")));
    }
    if !(DOMAIN_MIN..=DOMAIN_MAX).contains(&value) {
        return Err(ApiError::InvalidSample(format!(
            "{value} outside [{DOMAIN_MIN}, {DOMAIN_MAX}]"
        )));
    }
    Ok(value)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still forecasting
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Encoding(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn list_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsListResponse> {
    Json(MetricsListResponse {
        metrics: state.engines.list().await,
    })
}

async fn push_history(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let total = request.samples.len();
    let valid: Vec<Sample> = request
        .samples
        .into_iter()
        .filter(|s| validate_value(s.value).is_ok())
        .collect();
    let rejected = total - valid.len();
    if rejected > 0 {
        warn!(metric = %metric, rejected = rejected, "Dropped invalid history samples");
    }

    let accepted = state.engines.bootstrap(&metric, valid).await?;
    info!(metric = %metric, accepted = accepted, "Seeded metric history");

    Ok(Json(HistoryResponse {
        metric,
        accepted,
        rejected,
    }))
}

async fn push_sample(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Json(request): Json<SampleRequest>,
) -> Result<Json<TickReport>, ApiError> {
    let value = validate_value(request.value)?;
    let timestamp = request.timestamp.unwrap_or_else(Utc::now);

    let report = state.engines.tick(&metric, timestamp, value).await?;
    Ok(Json(report))
}

async fn last_report(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
) -> Result<Json<TickReport>, ApiError> {
    state
        .engines
        .last_report(&metric)
        .map(Json)
        .ok_or(ApiError::NotFound(metric))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/metrics", get(list_metrics))
        .route("/api/v1/metrics/:name/history", post(push_history))
        .route("/api/v1/metrics/:name/samples", post(push_sample))
        .route("/api/v1/metrics/:name/report", get(last_report))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_value_bounds() {
        assert_eq!(validate_value(0.0).unwrap(), 0.0);
        assert_eq!(validate_value(100.0).unwrap(), 100.0);
        assert!(matches!(validate_value(100.5), Err(ApiError::InvalidSample(_))));
        assert!(matches!(validate_value(-1.0), Err(ApiError::InvalidSample(_))));
        assert!(matches!(validate_value(f64::NAN), Err(ApiError::InvalidSample(_))));
    }
}
