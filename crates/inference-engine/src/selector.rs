//! Feature Selection

use crate::InferenceError;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Column selector fitted on a training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelector {
    /// Indices of retained columns, ascending
    keep: Vec<usize>,
    /// Number of columns seen during fitting
    input_dimension: usize,
}

impl FeatureSelector {
    /// Keep the columns whose population variance exceeds `threshold`
    pub fn fit_variance_threshold(
        features: ArrayView2<'_, f64>,
        threshold: f64,
    ) -> Result<Self, InferenceError> {
        let rows = features.nrows();
        if rows == 0 {
            return Err(InferenceError::TrainingFailed(
                "cannot fit selector on an empty matrix".to_string(),
            ));
        }

        let n = rows as f64;
        let keep: Vec<usize> = (0..features.ncols())
            .filter(|&j| {
                let column = features.column(j);
                let mean = column.sum() / n;
                let variance = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                variance > threshold
            })
            .collect();

        if keep.is_empty() {
            return Err(InferenceError::TrainingFailed(format!(
                "no feature has variance above {}",
                threshold
            )));
        }

        Ok(Self {
            keep,
            input_dimension: features.ncols(),
        })
    }

    /// Retained column indices
    pub fn selected(&self) -> &[usize] {
        &self.keep
    }

    /// Reduce a feature matrix to the retained columns
    pub fn transform(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>, InferenceError> {
        self.check_dimension(features.ncols())?;
        Ok(features.select(Axis(1), &self.keep))
    }

    /// Reduce a single feature row
    pub fn transform_one(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_dimension(row.len())?;
        Ok(self.keep.iter().map(|&j| row[j]).collect())
    }

    fn check_dimension(&self, actual: usize) -> Result<(), InferenceError> {
        if actual != self.input_dimension {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} features", self.input_dimension),
                actual: format!("{} features", actual),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_drops_constant_columns() {
        let features = array![[1.0, 5.0, 0.0], [2.0, 5.0, 4.0], [3.0, 5.0, 8.0]];
        let selector = FeatureSelector::fit_variance_threshold(features.view(), 0.0).unwrap();

        assert_eq!(selector.selected(), &[0, 2]);
        assert_eq!(selector.transform_one(&[9.0, 5.0, 7.0]).unwrap(), vec![9.0, 7.0]);
        assert_eq!(selector.transform(features.view()).unwrap().ncols(), 2);
    }

    #[test]
    fn test_all_constant_is_an_error() {
        let features = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(FeatureSelector::fit_variance_threshold(features.view(), 0.0).is_err());
    }
}
