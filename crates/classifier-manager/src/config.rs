//! Lifecycle manager configuration

use feature_engine::{FeatureConfig, RangeMode};
use inference_engine::{ModelKind, ModelParams, RandomForestParams};
use serde::{Deserialize, Serialize};

/// Classifier lifecycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Model family for newly trained classifiers
    pub model: ModelKind,
    /// Random forest hyper-parameters
    pub forest: RandomForestParams,
    /// Source of the per-channel range feature
    pub range_mode: RangeMode,
    /// Drop scaled feature columns whose variance is not above this value
    pub variance_threshold: Option<f64>,
    /// Deleting a sensor also deletes its samples and classifier
    pub cascade_delete: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::RandomForest,
            forest: RandomForestParams::default(),
            range_mode: RangeMode::PreviousChannel,
            variance_threshold: None,
            cascade_delete: true,
        }
    }
}

impl ManagerConfig {
    /// Parameters for every model family
    pub fn model_params(&self) -> ModelParams {
        ModelParams { forest: self.forest }
    }

    /// Feature extraction settings
    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            range_mode: self.range_mode,
        }
    }
}
