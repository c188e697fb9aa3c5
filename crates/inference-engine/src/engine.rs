//! Estimator capability and model registry

use crate::artifact::Artifact;
use crate::forest::{RandomForest, RandomForestParams};
use crate::InferenceError;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// A trainable classifier mapping scaled feature rows to class indices
pub trait Estimator: fmt::Debug + Send + Sync {
    /// Which registered model this is
    fn kind(&self) -> ModelKind;

    /// Whether `fit` has completed successfully
    fn is_fitted(&self) -> bool;

    /// Fit on a matrix whose rows are samples, with targets in `0..n_classes`
    fn fit(
        &mut self,
        features: ArrayView2<'_, f64>,
        targets: &[usize],
        n_classes: usize,
    ) -> Result<(), InferenceError>;

    /// Predict a class index for one row
    fn predict(&self, features: &[f64]) -> Result<usize, InferenceError>;

    /// Encode the trained state; restored with [`ModelKind::decode`]
    fn to_bytes(&self) -> Result<Vec<u8>, InferenceError>;
}

/// Registered model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Bagged CART trees
    #[default]
    RandomForest,
}

/// Hyper-parameters for every registered model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub forest: RandomForestParams,
}

impl ModelKind {
    /// Stored model name
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random forest",
        }
    }

    /// Look up a model by its stored name
    pub fn from_name(name: &str) -> Result<Self, InferenceError> {
        match name {
            "random forest" => Ok(ModelKind::RandomForest),
            other => Err(InferenceError::UnknownModel(other.to_string())),
        }
    }

    /// Create an unfitted estimator
    pub fn create(&self, params: &ModelParams) -> Box<dyn Estimator> {
        info!("Creating {} estimator", self.name());
        match self {
            ModelKind::RandomForest => Box::new(RandomForest::new(params.forest)),
        }
    }

    /// Restore an estimator from bytes produced by [`Estimator::to_bytes`]
    pub fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Estimator>, InferenceError> {
        match self {
            ModelKind::RandomForest => Ok(Box::new(RandomForest::decode(bytes)?)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Estimator for RandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn is_fitted(&self) -> bool {
        RandomForest::is_fitted(self)
    }

    fn fit(
        &mut self,
        features: ArrayView2<'_, f64>,
        targets: &[usize],
        n_classes: usize,
    ) -> Result<(), InferenceError> {
        RandomForest::fit(self, features, targets, n_classes)
    }

    fn predict(&self, features: &[f64]) -> Result<usize, InferenceError> {
        RandomForest::predict(self, features)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, InferenceError> {
        self.encode()
    }
}
