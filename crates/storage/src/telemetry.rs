//! Telemetry Time-Series Store

use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Errors while fetching readings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange { start: f64, end: f64 },
    #[error("Telemetry backend unavailable: {0}")]
    Unavailable(String),
}

/// Source of raw channel readings
pub trait TelemetrySource: Send + Sync {
    /// Readings of `channel_id` with `start <= timestamp <= end`, oldest first
    fn get_readings(
        &self,
        channel_id: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<f64>, TelemetryError>;
}

/// In-memory per-channel series of `(timestamp, value)` kept sorted by time
#[derive(Default)]
pub struct TimeSeriesStore {
    channels: RwLock<HashMap<String, Vec<(f64, f64)>>>,
}

impl TimeSeriesStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reading
    pub fn record(
        &self,
        channel_id: &str,
        timestamp: f64,
        value: f64,
    ) -> Result<(), TelemetryError> {
        self.record_batch(channel_id, &[(timestamp, value)])
    }

    /// Record a batch of `(timestamp, value)` readings
    pub fn record_batch(
        &self,
        channel_id: &str,
        readings: &[(f64, f64)],
    ) -> Result<(), TelemetryError> {
        let mut channels = self
            .channels
            .write()
            .map_err(|e| TelemetryError::Unavailable(format!("Lock error: {}", e)))?;

        let series = channels.entry(channel_id.to_string()).or_default();
        series.extend_from_slice(readings);
        // Stable sort keeps arrival order for equal timestamps
        series.sort_by(|a, b| a.0.total_cmp(&b.0));

        debug!("Recorded {} readings on channel {}", readings.len(), channel_id);
        Ok(())
    }

    /// Number of readings stored for a channel
    pub fn reading_count(&self, channel_id: &str) -> usize {
        self.channels
            .read()
            .map(|c| c.get(channel_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Known channel ids
    pub fn channels(&self) -> Vec<String> {
        self.channels
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl TelemetrySource for TimeSeriesStore {
    fn get_readings(
        &self,
        channel_id: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<f64>, TelemetryError> {
        if start > end {
            return Err(TelemetryError::InvalidRange { start, end });
        }

        let channels = self
            .channels
            .read()
            .map_err(|e| TelemetryError::Unavailable(format!("Lock error: {}", e)))?;
        let series = channels
            .get(channel_id)
            .ok_or_else(|| TelemetryError::UnknownChannel(channel_id.to_string()))?;

        let first = series.partition_point(|(ts, _)| *ts < start);
        Ok(series[first..]
            .iter()
            .take_while(|(ts, _)| *ts <= end)
            .map(|(_, value)| *value)
            .collect())
    }
}
