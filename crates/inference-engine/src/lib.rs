//! Classifier Inference Engine
//!
//! Trained building blocks of a virtual sensor classifier: a standard
//! scaler, an optional feature selector and an ensemble-tree model, all of
//! which can be encoded to opaque bytes and restored later.

mod artifact;
mod engine;
mod forest;
mod scaler;
mod selector;

pub use artifact::Artifact;
pub use engine::{Estimator, ModelKind, ModelParams};
pub use forest::{DecisionTree, MaxFeatures, RandomForest, RandomForestParams};
pub use scaler::StandardScaler;
pub use selector::FeatureSelector;

use thiserror::Error;

/// Errors while fitting, running or restoring a model
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model is not fitted")]
    NotFitted,
    #[error("Training failed: {0}")]
    TrainingFailed(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}
