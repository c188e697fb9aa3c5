//! Persisted document shapes

use serde::{Deserialize, Serialize};

/// A virtual sensor: the classification target built from input channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    pub name: String,
    /// Label vocabulary offered to annotators
    #[serde(default)]
    pub labels: Vec<String>,
    /// Input channel ids in the telemetry store
    pub inputs: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// A human-labeled training window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub sensor_id: String,
    /// Window start (unix seconds)
    pub start_time: f64,
    /// Window end (unix seconds)
    pub end_time: f64,
    pub label: String,
}

impl SampleDocument {
    /// Window duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A trained classifier with its sub-artifacts as opaque blobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierDocument {
    pub id: Option<String>,
    pub owner_id: String,
    pub sensor_id: String,
    pub model_name: String,
    pub labels: Vec<String>,
    /// Prediction window width (seconds)
    pub sampling_period: f64,
    pub model_blob: Vec<u8>,
    pub scaler_blob: Vec<u8>,
    pub selector_blob: Vec<u8>,
}
