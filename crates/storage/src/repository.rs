//! Repository Implementation

use crate::documents::{ClassifierDocument, SampleDocument, SensorDocument};
use crate::{ClassifierStore, MetadataStore, StorageError};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// In-memory repository for sensors, samples and classifiers
pub struct Repository {
    /// Virtual sensors
    sensors: Mutex<Vec<SensorDocument>>,
    /// Labeled samples, in insertion order
    samples: Mutex<Vec<SampleDocument>>,
    /// Classifier documents
    classifiers: Mutex<Vec<ClassifierDocument>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            sensors: Mutex::new(Vec::new()),
            samples: Mutex::new(Vec::new()),
            classifiers: Mutex::new(Vec::new()),
        }
    }

    /// Get total sensor count
    pub fn sensor_count(&self) -> usize {
        self.sensors.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Get total sample count
    pub fn sample_count(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Get total classifier count
    pub fn classifier_count(&self) -> usize {
        self.classifiers.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore for Repository {
    fn insert_sensor(&self, mut sensor: SensorDocument) -> Result<String, StorageError> {
        let mut sensors = lock(&self.sensors)?;
        let id = new_id();
        sensor.id = Some(id.clone());
        sensors.push(sensor);
        debug!("Inserted sensor {}", id);
        Ok(id)
    }

    fn replace_sensor(&self, id: &str, mut sensor: SensorDocument) -> Result<String, StorageError> {
        let mut sensors = lock(&self.sensors)?;
        let slot = sensors
            .iter_mut()
            .find(|s| s.id.as_deref() == Some(id))
            .ok_or(StorageError::NotFound)?;
        sensor.id = Some(id.to_string());
        *slot = sensor;
        debug!("Replaced sensor {}", id);
        Ok(id.to_string())
    }

    fn delete_sensor(&self, id: &str, owner_id: &str) -> Result<bool, StorageError> {
        let mut sensors = lock(&self.sensors)?;
        let before = sensors.len();
        sensors.retain(|s| !(s.id.as_deref() == Some(id) && s.owner_id == owner_id));
        Ok(sensors.len() < before)
    }

    fn sensor(&self, id: &str, owner_id: &str) -> Result<Option<SensorDocument>, StorageError> {
        let sensors = lock(&self.sensors)?;
        Ok(sensors
            .iter()
            .find(|s| s.id.as_deref() == Some(id) && s.owner_id == owner_id)
            .cloned())
    }

    fn sensors(&self, owner_id: &str) -> Result<Vec<SensorDocument>, StorageError> {
        let sensors = lock(&self.sensors)?;
        Ok(sensors.iter().filter(|s| s.owner_id == owner_id).cloned().collect())
    }

    fn insert_sample(&self, mut sample: SampleDocument) -> Result<String, StorageError> {
        let mut samples = lock(&self.samples)?;
        let id = new_id();
        sample.id = Some(id.clone());
        samples.push(sample);
        debug!("Inserted sample {}", id);
        Ok(id)
    }

    fn sample(&self, id: &str, owner_id: &str) -> Result<Option<SampleDocument>, StorageError> {
        let samples = lock(&self.samples)?;
        Ok(samples
            .iter()
            .find(|s| s.id.as_deref() == Some(id) && s.owner_id == owner_id)
            .cloned())
    }

    fn samples(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Vec<SampleDocument>, StorageError> {
        let samples = lock(&self.samples)?;
        Ok(samples
            .iter()
            .filter(|s| s.sensor_id == sensor_id && s.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn delete_sample(
        &self,
        sensor_id: &str,
        owner_id: &str,
        sample_id: &str,
    ) -> Result<usize, StorageError> {
        let mut samples = lock(&self.samples)?;
        let before = samples.len();
        samples.retain(|s| {
            !(s.id.as_deref() == Some(sample_id)
                && s.sensor_id == sensor_id
                && s.owner_id == owner_id)
        });
        Ok(before - samples.len())
    }

    fn delete_samples(&self, sensor_id: &str, owner_id: &str) -> Result<usize, StorageError> {
        let mut samples = lock(&self.samples)?;
        let before = samples.len();
        samples.retain(|s| !(s.sensor_id == sensor_id && s.owner_id == owner_id));
        Ok(before - samples.len())
    }
}

impl ClassifierStore for Repository {
    fn insert(&self, mut document: ClassifierDocument) -> Result<String, StorageError> {
        let mut classifiers = lock(&self.classifiers)?;
        let id = new_id();
        document.id = Some(id.clone());
        classifiers.push(document);
        debug!("Inserted classifier {}", id);
        Ok(id)
    }

    fn replace(&self, id: &str, mut document: ClassifierDocument) -> Result<String, StorageError> {
        let mut classifiers = lock(&self.classifiers)?;
        let slot = classifiers
            .iter_mut()
            .find(|c| c.id.as_deref() == Some(id))
            .ok_or(StorageError::NotFound)?;
        document.id = Some(id.to_string());
        *slot = document;
        debug!("Replaced classifier {}", id);
        Ok(id.to_string())
    }

    fn find_one(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Option<ClassifierDocument>, StorageError> {
        let classifiers = lock(&self.classifiers)?;
        Ok(classifiers
            .iter()
            .find(|c| c.sensor_id == sensor_id && c.owner_id == owner_id)
            .cloned())
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut classifiers = lock(&self.classifiers)?;
        let before = classifiers.len();
        classifiers.retain(|c| c.id.as_deref() != Some(id));
        Ok(classifiers.len() < before)
    }
}
