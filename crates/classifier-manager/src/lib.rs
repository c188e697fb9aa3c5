//! Virtual Sensor Classifier Lifecycle
//!
//! Builds labeled training corpora from telemetry, trains and persists a
//! classifier per (sensor, owner), and classifies live windows with it.

mod classifier;
mod config;
mod corpus;
mod error;
mod manager;
mod persistence;
mod result;

#[cfg(test)]
mod testing;

pub use classifier::Classifier;
pub use config::ManagerConfig;
pub use corpus::{CorpusAssembler, LabeledWindow, TrainingCorpus};
pub use error::ClassifierError;
pub use manager::{ClassifierManager, Clock};
pub use persistence::ClassifierRepository;
pub use result::{ClassifierResult, ResultStatus};

pub use feature_engine::RangeMode;
pub use inference_engine::{MaxFeatures, ModelKind, RandomForestParams};
