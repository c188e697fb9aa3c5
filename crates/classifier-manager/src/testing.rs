//! Shared test fixture: in-memory stores plus a telemetry source that
//! records every requested range.

use crate::config::ManagerConfig;
use crate::corpus::CorpusAssembler;
use crate::manager::ClassifierManager;
use inference_engine::{MaxFeatures, RandomForestParams};
use std::sync::{Arc, Mutex};
use storage::{
    MetadataStore, Repository, SampleDocument, SensorDocument, TelemetryError, TelemetrySource,
    TimeSeriesStore,
};

/// Quiet signal around zero
pub fn idle_signal(t: f64) -> f64 {
    0.1 * t.sin()
}

/// Large oscillation around ten
pub fn motion_signal(t: f64) -> f64 {
    10.0 + 5.0 * t.sin()
}

/// Telemetry that remembers each `(channel, start, end)` it served
#[derive(Default)]
pub struct RecordingTelemetry {
    pub store: TimeSeriesStore,
    requests: Mutex<Vec<(String, f64, f64)>>,
}

impl TelemetrySource for RecordingTelemetry {
    fn get_readings(
        &self,
        channel_id: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<f64>, TelemetryError> {
        self.requests
            .lock()
            .unwrap()
            .push((channel_id.to_string(), start, end));
        self.store.get_readings(channel_id, start, end)
    }
}

pub struct Fixture {
    pub repository: Arc<Repository>,
    pub telemetry: Arc<RecordingTelemetry>,
}

impl Fixture {
    pub const OWNER: &'static str = "alice";

    pub fn new() -> Self {
        Self {
            repository: Arc::new(Repository::new()),
            telemetry: Arc::new(RecordingTelemetry::default()),
        }
    }

    pub fn sensor(&self, inputs: &[&str]) -> String {
        self.repository
            .insert_sensor(SensorDocument {
                owner_id: Self::OWNER.to_string(),
                name: "desk".to_string(),
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            })
            .unwrap()
    }

    /// Constant readings at `start, start + step, ..., end`
    pub fn flat(&self, channel: &str, start: f64, end: f64, step: f64) {
        self.signal(channel, start, end, step, |_| 1.0);
    }

    /// Readings of `f(t)` at `start, start + step, ..., end`
    pub fn signal(&self, channel: &str, start: f64, end: f64, step: f64, f: impl Fn(f64) -> f64) {
        let steps = ((end - start) / step).round() as usize;
        let readings: Vec<(f64, f64)> = (0..=steps)
            .map(|i| {
                let t = start + i as f64 * step;
                (t, f(t))
            })
            .collect();
        self.telemetry.store.record_batch(channel, &readings).unwrap();
    }

    pub fn sample(&self, sensor_id: &str, start: f64, end: f64, label: &str) -> String {
        self.repository
            .insert_sample(SampleDocument {
                owner_id: Self::OWNER.to_string(),
                sensor_id: sensor_id.to_string(),
                start_time: start,
                end_time: end,
                label: label.to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    pub fn assembler(&self) -> CorpusAssembler {
        CorpusAssembler::new(self.repository.clone(), self.telemetry.clone())
    }

    pub fn manager(&self) -> ClassifierManager {
        self.manager_with(test_config())
    }

    pub fn manager_with(&self, config: ManagerConfig) -> ClassifierManager {
        ClassifierManager::new(
            self.repository.clone(),
            self.telemetry.clone(),
            self.repository.clone(),
            config,
        )
    }

    /// Ranges served so far, oldest first
    pub fn requests(&self) -> Vec<(String, f64, f64)> {
        self.telemetry.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.telemetry.requests.lock().unwrap().clear();
    }
}

/// Forest without bagging that considers every feature at each split
pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        forest: RandomForestParams {
            max_features: MaxFeatures::All,
            bootstrap: false,
            ..Default::default()
        },
        ..Default::default()
    }
}
