//! Storage Layer
//!
//! Document shapes and store contracts consumed by the classifier pipeline,
//! with in-memory repository implementations.

mod documents;
mod repository;
mod telemetry;

pub use documents::{ClassifierDocument, SampleDocument, SensorDocument};
pub use repository::Repository;
pub use telemetry::{TelemetryError, TelemetrySource, TimeSeriesStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
}

/// Sensors and their labeled samples.
///
/// Lookups return `None` or an empty list when nothing matches.
pub trait MetadataStore: Send + Sync {
    /// Insert a sensor, returning its new id
    fn insert_sensor(&self, sensor: SensorDocument) -> Result<String, StorageError>;
    /// Replace a sensor document in full
    fn replace_sensor(&self, id: &str, sensor: SensorDocument) -> Result<String, StorageError>;
    /// Delete a sensor; returns whether a record was removed
    fn delete_sensor(&self, id: &str, owner_id: &str) -> Result<bool, StorageError>;
    /// Get a sensor owned by `owner_id`
    fn sensor(&self, id: &str, owner_id: &str) -> Result<Option<SensorDocument>, StorageError>;
    /// List every sensor owned by `owner_id`
    fn sensors(&self, owner_id: &str) -> Result<Vec<SensorDocument>, StorageError>;

    /// Insert a sample, returning its new id
    fn insert_sample(&self, sample: SampleDocument) -> Result<String, StorageError>;
    /// Get a sample owned by `owner_id`
    fn sample(&self, id: &str, owner_id: &str) -> Result<Option<SampleDocument>, StorageError>;
    /// Samples of a sensor in insertion order
    fn samples(&self, sensor_id: &str, owner_id: &str) -> Result<Vec<SampleDocument>, StorageError>;
    /// Delete one sample; returns the number removed
    fn delete_sample(
        &self,
        sensor_id: &str,
        owner_id: &str,
        sample_id: &str,
    ) -> Result<usize, StorageError>;
    /// Delete all samples of a sensor; returns the number removed
    fn delete_samples(&self, sensor_id: &str, owner_id: &str) -> Result<usize, StorageError>;
}

/// Trained classifier documents.
///
/// The store does not enforce one document per (sensor, owner).
pub trait ClassifierStore: Send + Sync {
    /// Insert a document, returning its new id
    fn insert(&self, document: ClassifierDocument) -> Result<String, StorageError>;
    /// Replace the document with `id` in full
    fn replace(&self, id: &str, document: ClassifierDocument) -> Result<String, StorageError>;
    /// First document for (sensor, owner)
    fn find_one(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Option<ClassifierDocument>, StorageError>;
    /// Delete by id; returns whether a record was removed
    fn delete(&self, id: &str) -> Result<bool, StorageError>;
}
