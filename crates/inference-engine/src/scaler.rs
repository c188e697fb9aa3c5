//! Standard (z-score) scaling of feature columns

use crate::InferenceError;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Per-column standardization to zero mean and unit variance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means
    means: Vec<f64>,
    /// Column standard deviations (1.0 for constant columns)
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit the scaler on a feature matrix (rows are samples)
    pub fn fit(features: ArrayView2<'_, f64>) -> Result<Self, InferenceError> {
        let rows = features.nrows();
        if rows == 0 {
            return Err(InferenceError::TrainingFailed(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n = rows as f64;
        let mut means = Vec::with_capacity(features.ncols());
        let mut scales = Vec::with_capacity(features.ncols());

        for j in 0..features.ncols() {
            let column = features.column(j);
            let mean = column.sum() / n;
            let variance = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let std_dev = variance.sqrt();

            means.push(mean);
            // Constant columns are centered but not rescaled
            scales.push(if std_dev > f64::EPSILON { std_dev } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    /// Build a scaler from known statistics
    pub fn from_parts(means: Vec<f64>, scales: Vec<f64>) -> Self {
        Self { means, scales }
    }

    /// Whether the scaler has been fitted
    pub fn is_fitted(&self) -> bool {
        !self.means.is_empty()
    }

    /// Number of columns the scaler expects
    pub fn dimension(&self) -> usize {
        self.means.len()
    }

    /// Column means
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Column scales
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Scale every row of a feature matrix
    pub fn transform(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        self.check_dimension(features.ncols())?;
        Ok(Array2::from_shape_fn(features.dim(), |(i, j)| {
            (features[[i, j]] - self.means[j]) / self.scales[j]
        }))
    }

    /// Scale a single feature row
    pub fn transform_one(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_dimension(row.len())?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (mean, scale))| (v - mean) / scale)
            .collect())
    }

    fn check_dimension(&self, actual: usize) -> Result<(), InferenceError> {
        if !self.is_fitted() {
            return Err(InferenceError::NotFitted);
        }
        if actual != self.dimension() {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} features", self.dimension()),
                actual: format!("{} features", actual),
            });
        }
        Ok(())
    }
}
