//! Classifier Lifecycle Manager
//!
//! Train and predict per (sensor, owner). The `try_*` operations return
//! typed errors; the envelope operations fold them into a
//! [`ClassifierResult`] for relaying to clients.

use crate::classifier::Classifier;
use crate::config::ManagerConfig;
use crate::corpus::CorpusAssembler;
use crate::persistence::ClassifierRepository;
use crate::result::ClassifierResult;
use crate::ClassifierError;
use chrono::Utc;
use feature_engine::FeatureExtractor;
use metrics::counter;
use std::sync::Arc;
use storage::{ClassifierStore, MetadataStore, TelemetrySource};
use tracing::{debug, info, warn};

/// Source of "now" in epoch seconds
pub type Clock = Arc<dyn Fn() -> f64 + Send + Sync>;

fn system_clock() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Drives the classifier lifecycle over explicit store handles
#[derive(Clone)]
pub struct ClassifierManager {
    metadata: Arc<dyn MetadataStore>,
    assembler: CorpusAssembler,
    repository: ClassifierRepository,
    extractor: FeatureExtractor,
    config: ManagerConfig,
    clock: Clock,
}

impl ClassifierManager {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        telemetry: Arc<dyn TelemetrySource>,
        classifiers: Arc<dyn ClassifierStore>,
        config: ManagerConfig,
    ) -> Self {
        info!(
            "Classifier manager ready (model: {}, range mode: {:?})",
            config.model, config.range_mode
        );
        Self {
            assembler: CorpusAssembler::new(metadata.clone(), telemetry),
            metadata,
            repository: ClassifierRepository::new(classifiers),
            extractor: FeatureExtractor::new(config.feature_config()),
            config,
            clock: Arc::new(system_clock),
        }
    }

    /// Replace the clock used when predict is called without a time
    pub fn with_clock(mut self, clock: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Stored classifier for (sensor, owner), if any
    pub fn load_classifier(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Option<Classifier>, ClassifierError> {
        self.repository.load(sensor_id, owner_id)
    }

    /// Train (or re-train) and persist the classifier; returns its id.
    ///
    /// Nothing is stored when the sensor has no samples.
    pub fn try_train(&self, sensor_id: &str, owner_id: &str) -> Result<String, ClassifierError> {
        let params = self.config.model_params();
        let mut classifier = match self.repository.load(sensor_id, owner_id)? {
            Some(existing) => existing,
            None => Classifier::new(sensor_id, owner_id, self.config.model.create(&params)),
        };

        let corpus = self.assembler.build_corpus(sensor_id, owner_id)?;
        classifier.fit(
            &corpus,
            &self.extractor,
            self.config.model.create(&params),
            self.config.variance_threshold,
        )?;

        // One classifier per (sensor, owner)
        if classifier.id.is_none() {
            if let Some(existing) = self.repository.find_id(sensor_id, owner_id)? {
                warn!(
                    "Classifier {} appeared for sensor {} during training, replacing it",
                    existing, sensor_id
                );
                classifier.id = Some(existing);
            }
        }

        self.repository.save(&mut classifier)
    }

    /// Classify the window `[end - sampling_period, end]`, where `end` is
    /// `at_time` or the current time.
    pub fn try_predict(
        &self,
        sensor_id: &str,
        owner_id: &str,
        at_time: Option<f64>,
    ) -> Result<String, ClassifierError> {
        let classifier = self
            .repository
            .load(sensor_id, owner_id)?
            .ok_or_else(|| {
                ClassifierError::NotFound(format!("no classifier for sensor {}", sensor_id))
            })?;
        let sensor = self
            .metadata
            .sensor(sensor_id, owner_id)?
            .ok_or_else(|| ClassifierError::NotFound(format!("sensor {}", sensor_id)))?;

        let end = at_time.unwrap_or_else(|| (self.clock)());
        let start = end - classifier.sampling_period;
        debug!("Predicting sensor {} over [{}, {}]", sensor_id, start, end);

        let window = self.assembler.fetch_window(&sensor.inputs, start, end)?;
        classifier.predict(&window, &self.extractor)
    }

    /// Remove the stored classifier; returns whether one existed
    pub fn try_delete_classifier(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<bool, ClassifierError> {
        match self.repository.find_id(sensor_id, owner_id)? {
            Some(id) => self.repository.delete(&id),
            None => Ok(false),
        }
    }

    /// Remove a sensor, and with `cascade_delete` its samples and classifier.
    ///
    /// Dependents are removed before the sensor itself.
    pub fn try_delete_sensor(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<bool, ClassifierError> {
        if self.metadata.sensor(sensor_id, owner_id)?.is_none() {
            return Ok(false);
        }
        if self.config.cascade_delete {
            let classifier = self.try_delete_classifier(sensor_id, owner_id)?;
            let samples = self.metadata.delete_samples(sensor_id, owner_id)?;
            info!(
                "Deleting sensor {} with {} samples (classifier removed: {})",
                sensor_id, samples, classifier
            );
        }
        Ok(self.metadata.delete_sensor(sensor_id, owner_id)?)
    }

    /// Train and report the outcome as an envelope
    pub fn train(&self, sensor_id: &str, owner_id: &str) -> ClassifierResult {
        match self.try_train(sensor_id, owner_id) {
            Ok(id) => {
                counter!("vsensor_train_total", "outcome" => "ok").increment(1);
                debug!("Stored classifier {} for sensor {}", id, sensor_id);
                ClassifierResult::ok("Classifier trained")
            }
            Err(e) => {
                counter!("vsensor_train_total", "outcome" => "error").increment(1);
                warn!("Training failed for sensor {}: {}", sensor_id, e);
                ClassifierResult::error(&e)
            }
        }
    }

    /// Predict and report the label as the envelope value
    pub fn predict(
        &self,
        sensor_id: &str,
        owner_id: &str,
        at_time: Option<f64>,
    ) -> ClassifierResult {
        match self.try_predict(sensor_id, owner_id, at_time) {
            Ok(label) => {
                counter!("vsensor_predict_total", "outcome" => "ok").increment(1);
                ClassifierResult::ok_with("Prediction made", label)
            }
            Err(e) => {
                counter!("vsensor_predict_total", "outcome" => "error").increment(1);
                warn!("Prediction failed for sensor {}: {}", sensor_id, e);
                ClassifierResult::error(&e)
            }
        }
    }

    pub fn delete_classifier(&self, sensor_id: &str, owner_id: &str) -> ClassifierResult {
        match self.try_delete_classifier(sensor_id, owner_id) {
            Ok(true) => ClassifierResult::ok("Classifier deleted"),
            Ok(false) => ClassifierResult::error(&ClassifierError::NotFound(format!(
                "no classifier for sensor {}",
                sensor_id
            ))),
            Err(e) => ClassifierResult::error(&e),
        }
    }

    pub fn delete_sensor(&self, sensor_id: &str, owner_id: &str) -> ClassifierResult {
        match self.try_delete_sensor(sensor_id, owner_id) {
            Ok(true) => ClassifierResult::ok("Sensor deleted"),
            Ok(false) => {
                ClassifierResult::error(&ClassifierError::NotFound(format!("sensor {}", sensor_id)))
            }
            Err(e) => ClassifierResult::error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultStatus;
    use crate::testing::{idle_signal, motion_signal, test_config, Fixture};
    use storage::{ClassifierDocument, Repository, StorageError};

    /// Classifier store whose deletes always fail
    struct FailingDelete(Arc<Repository>);

    impl ClassifierStore for FailingDelete {
        fn insert(&self, document: ClassifierDocument) -> Result<String, StorageError> {
            self.0.insert(document)
        }

        fn replace(&self, id: &str, document: ClassifierDocument) -> Result<String, StorageError> {
            self.0.replace(id, document)
        }

        fn find_one(
            &self,
            sensor_id: &str,
            owner_id: &str,
        ) -> Result<Option<ClassifierDocument>, StorageError> {
            self.0.find_one(sensor_id, owner_id)
        }

        fn delete(&self, _id: &str) -> Result<bool, StorageError> {
            Err(StorageError::DatabaseError("connection lost".to_string()))
        }
    }

    /// Idle readings on [0, 100), motion on [100, 200], on two channels
    fn recorded(fixture: &Fixture) -> String {
        let sensor_id = fixture.sensor(&["pir", "vib"]);
        fixture.signal("pir", 0.0, 99.5, 0.5, idle_signal);
        fixture.signal("pir", 100.0, 200.0, 0.5, motion_signal);
        fixture.signal("vib", 0.0, 99.5, 0.5, |t| 2.0 * (0.7 * t).cos());
        fixture.signal("vib", 100.0, 200.0, 0.5, |t| 20.0 + 6.0 * (0.7 * t).cos());
        sensor_id
    }

    fn labeled(fixture: &Fixture, sensor_id: &str, order: &[(&str, f64)]) {
        for (label, start) in order {
            fixture.sample(sensor_id, *start, start + 10.0, label);
        }
    }

    fn stored(fixture: &Fixture, sensor_id: &str) -> Option<ClassifierDocument> {
        ClassifierRepository::new(fixture.repository.clone())
            .document(sensor_id, Fixture::OWNER)
            .unwrap()
    }

    #[test]
    fn test_train_then_predict() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(
            &fixture,
            &sensor_id,
            &[("idle", 0.0), ("motion", 110.0), ("idle", 40.0), ("motion", 150.0)],
        );
        let manager = fixture.manager();

        let result = manager.train(&sensor_id, Fixture::OWNER);
        assert!(result.is_ok(), "{:?}", result);
        assert!(result.value.is_none());
        assert_eq!(fixture.repository.classifier_count(), 1);

        let idle = manager.predict(&sensor_id, Fixture::OWNER, Some(80.0));
        assert_eq!(idle.value.as_deref(), Some("idle"));
        let motion = manager.predict(&sensor_id, Fixture::OWNER, Some(190.0));
        assert_eq!(motion.value.as_deref(), Some("motion"));
    }

    #[test]
    fn test_no_samples_leaves_stored_document_unchanged() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();
        let before = stored(&fixture, &sensor_id).unwrap();

        fixture.repository.delete_samples(&sensor_id, Fixture::OWNER).unwrap();
        let result = manager.train(&sensor_id, Fixture::OWNER);

        assert_eq!(result.status, ResultStatus::Error);
        assert!(result.message.contains("No samples"));
        assert_eq!(stored(&fixture, &sensor_id).unwrap(), before);
    }

    #[test]
    fn test_no_samples_persists_nothing() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);

        assert!(matches!(
            fixture.manager().try_train(&sensor_id, Fixture::OWNER),
            Err(ClassifierError::NoSamples(_))
        ));
        assert_eq!(fixture.repository.classifier_count(), 0);
    }

    #[test]
    fn test_predict_before_train_is_not_found() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);

        assert!(matches!(
            fixture.manager().try_predict(&sensor_id, Fixture::OWNER, Some(50.0)),
            Err(ClassifierError::NotFound(_))
        ));
        let result = fixture.manager().predict(&sensor_id, Fixture::OWNER, Some(50.0));
        assert_eq!(result.status, ResultStatus::Error);
        assert!(result.value.is_none());
    }

    #[test]
    fn test_sampling_period_is_mean_duration() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        fixture.sample(&sensor_id, 0.0, 10.0, "idle");
        fixture.sample(&sensor_id, 120.0, 140.0, "motion");

        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        let classifier = manager.load_classifier(&sensor_id, Fixture::OWNER).unwrap().unwrap();
        assert_eq!(classifier.sampling_period, 15.0);
    }

    #[test]
    fn test_predict_fetches_sampling_period_window() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        fixture.sample(&sensor_id, 0.0, 10.0, "idle");
        fixture.sample(&sensor_id, 120.0, 140.0, "motion");
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        fixture.clear_requests();
        manager.try_predict(&sensor_id, Fixture::OWNER, Some(90.0)).unwrap();
        assert_eq!(
            fixture.requests(),
            vec![("pir".to_string(), 75.0, 90.0), ("vib".to_string(), 75.0, 90.0)]
        );

        // A longer sample widens the prediction window
        fixture.sample(&sensor_id, 150.0, 180.0, "motion");
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();
        fixture.clear_requests();
        manager.try_predict(&sensor_id, Fixture::OWNER, Some(90.0)).unwrap();
        assert_eq!(fixture.requests()[0], ("pir".to_string(), 70.0, 90.0));
    }

    #[test]
    fn test_predict_without_time_uses_clock() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        let manager = fixture.manager().with_clock(|| 195.0);
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        fixture.clear_requests();
        assert_eq!(manager.try_predict(&sensor_id, Fixture::OWNER, None).unwrap(), "motion");
        assert_eq!(fixture.requests()[0], ("pir".to_string(), 185.0, 195.0));
    }

    #[test]
    fn test_vocabulary_stable_across_sample_order() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 110.0), ("idle", 30.0)]);
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();
        let first = stored(&fixture, &sensor_id).unwrap();
        assert_eq!(first.labels, vec!["idle", "motion"]);

        // Same label set, motion now seen first
        fixture.repository.delete_samples(&sensor_id, Fixture::OWNER).unwrap();
        labeled(&fixture, &sensor_id, &[("motion", 150.0), ("idle", 60.0), ("motion", 170.0)]);
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        let second = stored(&fixture, &sensor_id).unwrap();
        assert_eq!(second.labels, vec!["idle", "motion"]);
        assert_eq!(second.id, first.id);
        assert_eq!(
            manager.try_predict(&sensor_id, Fixture::OWNER, Some(85.0)).unwrap(),
            "idle"
        );
    }

    #[test]
    fn test_new_label_replaces_vocabulary() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 110.0)]);
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        labeled(&fixture, &sensor_id, &[("busy", 160.0)]);
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        assert_eq!(
            stored(&fixture, &sensor_id).unwrap().labels,
            vec!["idle", "motion", "busy"]
        );
    }

    #[test]
    fn test_missing_channel_data_is_upstream_error() {
        let fixture = Fixture::new();
        let sensor_id = fixture.sensor(&["pir", "ghost"]);
        fixture.signal("pir", 0.0, 20.0, 0.5, idle_signal);
        fixture.sample(&sensor_id, 0.0, 10.0, "idle");

        let result = fixture.manager().train(&sensor_id, Fixture::OWNER);
        assert_eq!(result.status, ResultStatus::Error);
        assert!(result.message.contains("ghost"));
        assert_eq!(fixture.repository.classifier_count(), 0);
    }

    #[test]
    fn test_predict_after_sensor_removed_is_not_found() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        let mut config = test_config();
        config.cascade_delete = false;
        let manager = fixture.manager_with(config);
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        assert!(manager.try_delete_sensor(&sensor_id, Fixture::OWNER).unwrap());
        assert_eq!(fixture.repository.classifier_count(), 1);
        assert!(matches!(
            manager.try_predict(&sensor_id, Fixture::OWNER, Some(50.0)),
            Err(ClassifierError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_sensor_cascades() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        assert!(manager.delete_sensor(&sensor_id, Fixture::OWNER).is_ok());
        assert_eq!(fixture.repository.sensor_count(), 0);
        assert_eq!(fixture.repository.sample_count(), 0);
        assert_eq!(fixture.repository.classifier_count(), 0);
        assert!(!manager.delete_sensor(&sensor_id, Fixture::OWNER).is_ok());
    }

    #[test]
    fn test_failed_cascade_keeps_sensor_for_retry() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        fixture.manager().try_train(&sensor_id, Fixture::OWNER).unwrap();

        let failing = ClassifierManager::new(
            fixture.repository.clone(),
            fixture.telemetry.clone(),
            Arc::new(FailingDelete(fixture.repository.clone())),
            test_config(),
        );
        assert!(matches!(
            failing.try_delete_sensor(&sensor_id, Fixture::OWNER),
            Err(ClassifierError::Persistence(_))
        ));
        assert_eq!(fixture.repository.sensor_count(), 1);
        assert_eq!(fixture.repository.sample_count(), 2);
        assert_eq!(fixture.repository.classifier_count(), 1);

        let manager = fixture.manager();
        assert!(manager.try_delete_sensor(&sensor_id, Fixture::OWNER).unwrap());
        assert_eq!(fixture.repository.sensor_count(), 0);
        assert_eq!(fixture.repository.sample_count(), 0);
        assert_eq!(fixture.repository.classifier_count(), 0);
    }

    #[test]
    fn test_delete_classifier() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        assert!(manager.delete_classifier(&sensor_id, Fixture::OWNER).is_ok());
        assert!(stored(&fixture, &sensor_id).is_none());
        assert_eq!(
            manager.delete_classifier(&sensor_id, Fixture::OWNER).status,
            ResultStatus::Error
        );
    }

    #[test]
    fn test_other_owner_sees_nothing() {
        let fixture = Fixture::new();
        let sensor_id = recorded(&fixture);
        labeled(&fixture, &sensor_id, &[("idle", 0.0), ("motion", 120.0)]);
        let manager = fixture.manager();
        manager.try_train(&sensor_id, Fixture::OWNER).unwrap();

        assert!(matches!(
            manager.try_train(&sensor_id, "mallory"),
            Err(ClassifierError::NoSamples(_))
        ));
        assert!(matches!(
            manager.try_predict(&sensor_id, "mallory", Some(50.0)),
            Err(ClassifierError::NotFound(_))
        ));
    }
}
