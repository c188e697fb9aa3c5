//! Telemetry ingest

use axum::{
    extract::{Path, State},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Batch of `[timestamp, value]` pairs
#[derive(Debug, Deserialize)]
pub struct ReadingsPayload {
    pub readings: Vec<(f64, f64)>,
}

#[derive(Debug, Serialize)]
pub struct Recorded {
    pub recorded: usize,
}

/// Append readings to a channel
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Json(payload): Json<ReadingsPayload>,
) -> Result<Json<Recorded>, ApiError> {
    if payload
        .readings
        .iter()
        .any(|(ts, value)| !ts.is_finite() || !value.is_finite())
    {
        return Err(ApiError::BadRequest("readings must be finite numbers".to_string()));
    }

    state.telemetry.record_batch(&channel_id, &payload.readings)?;
    counter!("vsensor_readings_ingested_total").increment(payload.readings.len() as u64);
    Ok(Json(Recorded {
        recorded: payload.readings.len(),
    }))
}
