//! Classifier Routes
//!
//! Each handler relays the manager's result envelope; training and
//! prediction run on the blocking pool.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use classifier_manager::{ClassifierManager, ClassifierResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Query parameters for predict
#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    /// Window end (epoch seconds); defaults to now
    pub t: Option<f64>,
}

async fn relay<F>(state: &AppState, op: F) -> Result<Json<ClassifierResult>, ApiError>
where
    F: FnOnce(&ClassifierManager, &str) -> ClassifierResult + Send + 'static,
{
    let manager = state.manager.clone();
    let owner = state.owner.clone();
    tokio::task::spawn_blocking(move || op(&manager, &owner))
        .await
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Train (or re-train) the sensor's classifier
pub async fn train(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> Result<Json<ClassifierResult>, ApiError> {
    relay(&state, move |manager, owner| manager.train(&sensor_id, owner)).await
}

/// Classify the latest (or the given) window
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<ClassifierResult>, ApiError> {
    relay(&state, move |manager, owner| manager.predict(&sensor_id, owner, query.t)).await
}

/// Delete the sensor's classifier
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> Result<Json<ClassifierResult>, ApiError> {
    relay(&state, move |manager, owner| manager.delete_classifier(&sensor_id, owner)).await
}
