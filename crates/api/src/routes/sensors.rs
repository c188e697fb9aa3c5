//! Sensor Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use classifier_manager::ClassifierResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::SensorDocument;
use tracing::info;

use crate::{ApiError, AppState};

/// Request body for creating or replacing a sensor
#[derive(Debug, Deserialize)]
pub struct SensorPayload {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Channel ids read by the classifier, in feature order
    pub inputs: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl SensorPayload {
    fn into_document(self, owner_id: &str) -> Result<SensorDocument, ApiError> {
        if self.inputs.is_empty() {
            return Err(ApiError::BadRequest(
                "a sensor needs at least one input channel".to_string(),
            ));
        }
        Ok(SensorDocument {
            id: None,
            owner_id: owner_id.to_string(),
            name: self.name,
            labels: self.labels,
            inputs: self.inputs,
            description: self.description,
        })
    }
}

/// Id of a newly created record
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
}

/// Create a sensor
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SensorPayload>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let document = payload.into_document(&state.owner)?;
    let id = state.metadata.insert_sensor(document)?;
    info!("Created sensor {}", id);
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// List the owner's sensors
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SensorDocument>>, ApiError> {
    Ok(Json(state.metadata.sensors(&state.owner)?))
}

/// Get one sensor
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SensorDocument>, ApiError> {
    state
        .metadata
        .sensor(&id, &state.owner)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("sensor {}", id)))
}

/// Replace a sensor document in full
pub async fn replace(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SensorPayload>,
) -> Result<Json<SensorDocument>, ApiError> {
    if state.metadata.sensor(&id, &state.owner)?.is_none() {
        return Err(ApiError::NotFound(format!("sensor {}", id)));
    }
    let mut document = payload.into_document(&state.owner)?;
    state.metadata.replace_sensor(&id, document.clone())?;
    document.id = Some(id);
    Ok(Json(document))
}

/// Delete a sensor (cascading per configuration)
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClassifierResult>, ApiError> {
    let manager = state.manager.clone();
    let owner = state.owner.clone();
    let result = tokio::task::spawn_blocking(move || manager.delete_sensor(&id, &owner))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(result))
}
