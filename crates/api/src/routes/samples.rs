//! Sample Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::SampleDocument;
use tracing::info;

use super::sensors::Created;
use crate::{ApiError, AppState};

/// Request body for a labeled time window
#[derive(Debug, Deserialize)]
pub struct SamplePayload {
    pub start_time: f64,
    pub end_time: f64,
    pub label: String,
}

/// Number of removed records
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: usize,
}

fn require_sensor(state: &AppState, sensor_id: &str) -> Result<(), ApiError> {
    match state.metadata.sensor(sensor_id, &state.owner)? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(format!("sensor {}", sensor_id))),
    }
}

/// Add a labeled sample to a sensor
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
    Json(payload): Json<SamplePayload>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    require_sensor(&state, &sensor_id)?;
    let finite = payload.start_time.is_finite() && payload.end_time.is_finite();
    if !finite || payload.start_time > payload.end_time {
        return Err(ApiError::BadRequest(format!(
            "invalid sample window [{}, {}]",
            payload.start_time, payload.end_time
        )));
    }

    let id = state.metadata.insert_sample(SampleDocument {
        id: None,
        owner_id: state.owner.clone(),
        sensor_id: sensor_id.clone(),
        start_time: payload.start_time,
        end_time: payload.end_time,
        label: payload.label,
    })?;
    info!("Added sample {} to sensor {}", id, sensor_id);
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// List a sensor's samples in insertion order
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> Result<Json<Vec<SampleDocument>>, ApiError> {
    require_sensor(&state, &sensor_id)?;
    Ok(Json(state.metadata.samples(&sensor_id, &state.owner)?))
}

/// Delete every sample of a sensor
pub async fn remove_all(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let deleted = state.metadata.delete_samples(&sensor_id, &state.owner)?;
    Ok(Json(Deleted { deleted }))
}

/// Delete one sample
pub async fn remove_one(
    State(state): State<Arc<AppState>>,
    Path((sensor_id, sample_id)): Path<(String, String)>,
) -> Result<Json<Deleted>, ApiError> {
    match state.metadata.delete_sample(&sensor_id, &state.owner, &sample_id)? {
        0 => Err(ApiError::NotFound(format!("sample {}", sample_id))),
        deleted => Ok(Json(Deleted { deleted })),
    }
}
