//! Classifier Error Types

use feature_engine::FeatureError;
use storage::{StorageError, TelemetryError};
use thiserror::Error;

/// Errors raised by train/predict and their collaborators
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The training corpus is empty
    #[error("No samples in the training set for sensor {0}")]
    NoSamples(String),

    /// No classifier, sensor or sample for the given keys
    #[error("Not found: {0}")]
    NotFound(String),

    /// A window cannot be turned into a feature vector
    #[error("Malformed window: {0}")]
    MalformedWindow(String),

    /// The telemetry collaborator failed
    #[error("Telemetry fetch failed for channel {channel}: {source}")]
    Upstream {
        channel: String,
        #[source]
        source: TelemetryError,
    },

    /// A store rejected a read or write, or a stored blob is unreadable
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The model could not be fitted
    #[error("Training failed: {0}")]
    Training(String),

    /// The model could not produce a label
    #[error("Prediction failed: {0}")]
    Prediction(String),
}

impl From<StorageError> for ClassifierError {
    fn from(err: StorageError) -> Self {
        ClassifierError::Persistence(err.to_string())
    }
}

impl From<FeatureError> for ClassifierError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::MalformedWindow(reason) => ClassifierError::MalformedWindow(reason),
        }
    }
}
