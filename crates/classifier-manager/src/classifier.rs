//! Live classifier artifact

use crate::corpus::TrainingCorpus;
use crate::ClassifierError;
use feature_engine::FeatureExtractor;
use inference_engine::{Estimator, FeatureSelector, StandardScaler};
use ndarray::Array2;
use std::collections::HashMap;
use tracing::{debug, info};

/// Trained (or freshly created) classifier for one (sensor, owner)
#[derive(Debug)]
pub struct Classifier {
    /// Store identity; `None` until first saved
    pub id: Option<String>,
    pub sensor_id: String,
    pub owner_id: String,
    /// Vocabulary; model outputs index into it
    pub labels: Vec<String>,
    /// Prediction window width (seconds)
    pub sampling_period: f64,
    pub(crate) scaler: StandardScaler,
    pub(crate) selector: Option<FeatureSelector>,
    pub(crate) model: Box<dyn Estimator>,
}

impl Classifier {
    /// Fresh, untrained classifier
    pub fn new(sensor_id: &str, owner_id: &str, model: Box<dyn Estimator>) -> Self {
        Self {
            id: None,
            sensor_id: sensor_id.to_string(),
            owner_id: owner_id.to_string(),
            labels: Vec::new(),
            sampling_period: 0.0,
            scaler: StandardScaler::default(),
            selector: None,
            model,
        }
    }

    /// Stored model name
    pub fn model_name(&self) -> &'static str {
        self.model.kind().name()
    }

    /// Whether scaler and model have been fitted
    pub fn is_trained(&self) -> bool {
        self.scaler.is_fitted() && self.model.is_fitted()
    }

    /// Fitted scaler
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Fitted selector, if feature selection was enabled
    pub fn selector(&self) -> Option<&FeatureSelector> {
        self.selector.as_ref()
    }

    /// Fit `model` on the corpus and adopt it.
    ///
    /// The classifier is only modified when every stage succeeds.
    pub fn fit(
        &mut self,
        corpus: &TrainingCorpus,
        extractor: &FeatureExtractor,
        mut model: Box<dyn Estimator>,
        variance_threshold: Option<f64>,
    ) -> Result<(), ClassifierError> {
        if corpus.is_empty() {
            return Err(ClassifierError::NoSamples(self.sensor_id.clone()));
        }

        let labels = reconcile_vocabulary(&self.labels, &corpus.labels);
        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();

        let mut width = None;
        let mut flat = Vec::new();
        let mut targets = Vec::with_capacity(corpus.len());

        for example in &corpus.examples {
            let features = extractor.extract(&example.timeseries)?;
            match width {
                None => width = Some(features.len()),
                Some(w) if w != features.len() => {
                    return Err(ClassifierError::MalformedWindow(format!(
                        "expected {} features, sample has {}",
                        w,
                        features.len()
                    )))
                }
                Some(_) => {}
            }
            flat.extend_from_slice(features.as_slice());

            let target = index.get(example.label.as_str()).ok_or_else(|| {
                let reason = format!("label {} missing from vocabulary", example.label);
                ClassifierError::Training(reason)
            })?;
            targets.push(*target);
        }

        let width = width.unwrap_or(0);
        let matrix = Array2::from_shape_vec((corpus.len(), width), flat)
            .map_err(|e| ClassifierError::Training(e.to_string()))?;

        let scaler = StandardScaler::fit(matrix.view())
            .map_err(|e| ClassifierError::Training(e.to_string()))?;
        let mut scaled = scaler
            .transform(matrix.view())
            .map_err(|e| ClassifierError::Training(e.to_string()))?;

        let selector = match variance_threshold {
            Some(threshold) => {
                let selector = FeatureSelector::fit_variance_threshold(scaled.view(), threshold)
                    .map_err(|e| ClassifierError::Training(e.to_string()))?;
                scaled = selector
                    .transform(scaled.view())
                    .map_err(|e| ClassifierError::Training(e.to_string()))?;
                debug!("Selected {} of {} features", selector.selected().len(), width);
                Some(selector)
            }
            None => None,
        };

        model
            .fit(scaled.view(), &targets, labels.len())
            .map_err(|e| ClassifierError::Training(e.to_string()))?;

        info!(
            "Trained {} for sensor {} on {} samples ({} features, labels {:?})",
            model.kind(),
            self.sensor_id,
            corpus.len(),
            width,
            labels
        );

        self.labels = labels;
        self.sampling_period = corpus.sampling_period;
        self.scaler = scaler;
        self.selector = selector;
        self.model = model;
        Ok(())
    }

    /// Classify one window of channel readings
    pub fn predict<C: AsRef<[f64]>>(
        &self,
        window: &[C],
        extractor: &FeatureExtractor,
    ) -> Result<String, ClassifierError> {
        if !self.is_trained() {
            return Err(ClassifierError::NotFound(format!(
                "classifier for sensor {} is not trained",
                self.sensor_id
            )));
        }

        let features = extractor.extract(window)?;
        let mut row = self
            .scaler
            .transform_one(features.as_slice())
            .map_err(|e| ClassifierError::Prediction(e.to_string()))?;
        if let Some(selector) = &self.selector {
            row = selector
                .transform_one(&row)
                .map_err(|e| ClassifierError::Prediction(e.to_string()))?;
        }

        let index = self
            .model
            .predict(&row)
            .map_err(|e| ClassifierError::Prediction(e.to_string()))?;

        self.labels.get(index).cloned().ok_or_else(|| {
            ClassifierError::Prediction(format!(
                "model output {} outside vocabulary of {} labels",
                index,
                self.labels.len()
            ))
        })
    }
}

/// Keep the stored order when a re-train sees the same label set;
/// otherwise adopt the corpus order.
fn reconcile_vocabulary(previous: &[String], observed: &[String]) -> Vec<String> {
    let same_set =
        previous.len() == observed.len() && observed.iter().all(|l| previous.contains(l));
    if same_set {
        previous.to_vec()
    } else {
        observed.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LabeledWindow;
    use crate::testing::{idle_signal, motion_signal};
    use inference_engine::{ModelKind, ModelParams};

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn window(signal: fn(f64) -> f64, start: f64) -> Vec<Vec<f64>> {
        vec![(0..=20).map(|i| signal(start + i as f64 * 0.5)).collect()]
    }

    fn corpus(order: &[&str]) -> TrainingCorpus {
        let mut examples = Vec::new();
        for (i, label) in order.iter().enumerate() {
            let signal = if *label == "idle" { idle_signal } else { motion_signal };
            examples.push(LabeledWindow {
                timeseries: window(signal, i as f64 * 10.0),
                label: label.to_string(),
            });
        }
        let mut seen: Vec<String> = Vec::new();
        for label in order {
            if !seen.iter().any(|s| s.as_str() == *label) {
                seen.push(label.to_string());
            }
        }
        TrainingCorpus {
            examples,
            labels: seen,
            sampling_period: 10.0,
        }
    }

    fn fresh() -> Classifier {
        Classifier::new(
            "s1",
            "alice",
            ModelKind::RandomForest.create(&ModelParams::default()),
        )
    }

    #[test]
    fn test_reconcile_keeps_previous_order_for_same_set() {
        let previous = labels(&["idle", "motion"]);
        assert_eq!(reconcile_vocabulary(&previous, &labels(&["motion", "idle"])), previous);
    }

    #[test]
    fn test_reconcile_adopts_new_vocabulary() {
        let previous = labels(&["idle", "motion"]);
        let observed = labels(&["motion", "idle", "door"]);
        assert_eq!(reconcile_vocabulary(&previous, &observed), observed);
        assert_eq!(reconcile_vocabulary(&[], &observed), observed);
    }

    #[test]
    fn test_fit_and_predict() {
        let extractor = FeatureExtractor::default();
        let mut classifier = fresh();
        let model = ModelKind::RandomForest.create(&ModelParams::default());
        let training = corpus(&["idle", "motion", "idle", "motion", "idle", "motion"]);
        classifier.fit(&training, &extractor, model, None).unwrap();

        assert!(classifier.is_trained());
        assert_eq!(classifier.labels, labels(&["idle", "motion"]));
        assert_eq!(classifier.sampling_period, 10.0);
        let predict = |signal: fn(f64) -> f64| {
            classifier
                .predict(&window(signal, 300.0), &extractor)
                .unwrap()
        };
        assert_eq!(predict(idle_signal), "idle");
        assert_eq!(predict(motion_signal), "motion");
    }

    #[test]
    fn test_vocabulary_stable_across_sample_order() {
        let extractor = FeatureExtractor::default();
        let mut classifier = fresh();
        let model = ModelKind::RandomForest.create(&ModelParams::default());
        classifier
            .fit(&corpus(&["idle", "motion", "idle", "motion"]), &extractor, model, None)
            .unwrap();

        let model = ModelKind::RandomForest.create(&ModelParams::default());
        classifier
            .fit(&corpus(&["motion", "idle", "motion", "idle"]), &extractor, model, None)
            .unwrap();

        assert_eq!(classifier.labels, labels(&["idle", "motion"]));
        assert_eq!(classifier.predict(&window(idle_signal, 500.0), &extractor).unwrap(), "idle");
    }

    #[test]
    fn test_variance_selector_drops_constant_columns() {
        let extractor = FeatureExtractor::default();
        let with_reference = |mut w: Vec<Vec<f64>>| {
            w.push((0..=20).map(|i| 2.0 * (0.7 * i as f64).cos()).collect());
            w
        };
        let mut training = corpus(&["idle", "motion", "idle", "motion"]);
        for example in &mut training.examples {
            example.timeseries = with_reference(example.timeseries.clone());
        }

        let mut classifier = fresh();
        let model = ModelKind::RandomForest.create(&ModelParams::default());
        classifier.fit(&training, &extractor, model, Some(0.0)).unwrap();

        // Channel 0 range slot is always zero with two channels
        let selector = classifier.selector().unwrap();
        assert!(!selector.selected().contains(&7));
        assert!(selector.selected().len() < 16);
        assert_eq!(
            classifier
                .predict(&with_reference(window(motion_signal, 700.0)), &extractor)
                .unwrap(),
            "motion"
        );
    }

    #[test]
    fn test_failed_fit_leaves_classifier_untouched() {
        let extractor = FeatureExtractor::default();
        let mut classifier = fresh();
        let mut bad = corpus(&["idle", "motion"]);
        bad.examples[1].timeseries = vec![Vec::new()];

        let model = ModelKind::RandomForest.create(&ModelParams::default());
        let result = classifier.fit(&bad, &extractor, model, None);

        assert!(matches!(result, Err(ClassifierError::MalformedWindow(_))));
        assert!(!classifier.is_trained());
        assert!(classifier.labels.is_empty());
    }

    #[test]
    fn test_channel_count_change_fails_prediction() {
        let extractor = FeatureExtractor::default();
        let mut classifier = fresh();
        let model = ModelKind::RandomForest.create(&ModelParams::default());
        classifier
            .fit(&corpus(&["idle", "motion"]), &extractor, model, None)
            .unwrap();

        let mut two_channels = window(idle_signal, 0.0);
        two_channels.push(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            classifier.predict(&two_channels, &extractor),
            Err(ClassifierError::Prediction(_))
        ));
    }

    #[test]
    fn test_untrained_classifier_cannot_predict() {
        let extractor = FeatureExtractor::default();
        assert!(matches!(
            fresh().predict(&window(idle_signal, 0.0), &extractor),
            Err(ClassifierError::NotFound(_))
        ));
    }
}
