//! Virtual Sensor API Server
//!
//! Thin REST relay over the metadata store, the telemetry store and the
//! classifier lifecycle manager.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use classifier_manager::ClassifierManager;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use storage::{MetadataStore, Repository, TimeSeriesStore};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
mod routes;

pub use crate::config::{AppConfig, LogConfig, ServerConfig};
pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    /// Sensors and samples
    pub metadata: Arc<dyn MetadataStore>,
    /// Channel readings
    pub telemetry: Arc<TimeSeriesStore>,
    /// Train/predict lifecycle
    pub manager: ClassifierManager,
    /// Owner applied to every request
    pub owner: String,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State backed by in-memory stores
    pub fn in_memory(config: &AppConfig) -> Self {
        let repository = Arc::new(Repository::new());
        let telemetry = Arc::new(TimeSeriesStore::new());
        let manager = ClassifierManager::new(
            repository.clone(),
            telemetry.clone(),
            repository.clone(),
            config.classifier.clone(),
        );

        Self {
            metadata: repository,
            telemetry,
            manager,
            owner: config.server.default_owner.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `GET /metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
    pub uptime_seconds: u64,
    pub channel_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/time", get(time_handler))
        .route(
            "/api/v1/sensors",
            post(routes::sensors::create).get(routes::sensors::list),
        )
        .route(
            "/api/v1/sensors/:id",
            get(routes::sensors::get_one)
                .put(routes::sensors::replace)
                .delete(routes::sensors::remove),
        )
        .route(
            "/api/v1/sensors/:id/samples",
            post(routes::samples::create)
                .get(routes::samples::list)
                .delete(routes::samples::remove_all),
        )
        .route(
            "/api/v1/sensors/:id/samples/:sample_id",
            delete(routes::samples::remove_one),
        )
        .route(
            "/api/v1/sensors/:id/classifier",
            delete(routes::classifier::remove),
        )
        .route(
            "/api/v1/sensors/:id/classifier/train",
            post(routes::classifier::train),
        )
        .route(
            "/api/v1/sensors/:id/classifier/predict",
            get(routes::classifier::predict),
        )
        .route(
            "/api/v1/channels/:id/readings",
            post(routes::readings::ingest),
        )
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        channel_count: state.telemetry.channels().len(),
    })
}

/// Server clock, for clients stamping sample boundaries
async fn time_handler() -> impl IntoResponse {
    let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    Json(serde_json::json!({ "timestamp": now }))
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(config: &LogConfig) -> Result<(), ApiError> {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| ApiError::Startup(format!("Failed to set tracing subscriber: {}", e)))
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), ApiError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Startup(format!("Failed to install metrics recorder: {}", e)))?;

    let state = Arc::new(AppState::in_memory(&config).with_metrics(handle));
    let app = create_router(state);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .map_err(|e| ApiError::Startup(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Startup(e.to_string()))?;

    Ok(())
}
