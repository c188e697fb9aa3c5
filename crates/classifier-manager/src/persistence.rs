//! Classifier persistence
//!
//! Plain fields are stored as-is; scaler, selector and model travel as
//! encoded blobs and the model decoder is chosen by the stored model name.

use crate::classifier::Classifier;
use crate::ClassifierError;
use inference_engine::{Artifact, FeatureSelector, ModelKind, StandardScaler};
use std::sync::Arc;
use storage::{ClassifierDocument, ClassifierStore};
use tracing::{debug, info};

/// Saves and loads classifiers through a [`ClassifierStore`]
#[derive(Clone)]
pub struct ClassifierRepository {
    store: Arc<dyn ClassifierStore>,
}

fn persistence<E: std::fmt::Display>(what: &'static str) -> impl Fn(E) -> ClassifierError {
    move |e| ClassifierError::Persistence(format!("{}: {}", what, e))
}

impl ClassifierRepository {
    pub fn new(store: Arc<dyn ClassifierStore>) -> Self {
        Self { store }
    }

    /// Insert when the classifier has no id yet, otherwise replace the whole
    /// document. The assigned id is written back to the classifier.
    pub fn save(&self, classifier: &mut Classifier) -> Result<String, ClassifierError> {
        let document = ClassifierDocument {
            id: classifier.id.clone(),
            owner_id: classifier.owner_id.clone(),
            sensor_id: classifier.sensor_id.clone(),
            model_name: classifier.model_name().to_string(),
            labels: classifier.labels.clone(),
            sampling_period: classifier.sampling_period,
            model_blob: classifier
                .model
                .to_bytes()
                .map_err(persistence("model encode"))?,
            scaler_blob: classifier.scaler.encode().map_err(persistence("scaler encode"))?,
            selector_blob: classifier
                .selector
                .encode()
                .map_err(persistence("selector encode"))?,
        };

        let id = match &classifier.id {
            Some(id) => self.store.replace(id, document)?,
            None => self.store.insert(document)?,
        };
        info!("Stored classifier {} for sensor {}", id, classifier.sensor_id);

        classifier.id = Some(id.clone());
        Ok(id)
    }

    /// Load the classifier of (sensor, owner), if one was stored
    pub fn load(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Option<Classifier>, ClassifierError> {
        let Some(document) = self.store.find_one(sensor_id, owner_id)? else {
            debug!("No classifier stored for sensor {}", sensor_id);
            return Ok(None);
        };

        let kind = ModelKind::from_name(&document.model_name).map_err(persistence("model name"))?;
        let model = kind
            .decode(&document.model_blob)
            .map_err(persistence("model decode"))?;
        let scaler = StandardScaler::decode(&document.scaler_blob)
            .map_err(persistence("scaler decode"))?;
        let selector = Option::<FeatureSelector>::decode(&document.selector_blob)
            .map_err(persistence("selector decode"))?;

        Ok(Some(Classifier {
            id: document.id,
            sensor_id: document.sensor_id,
            owner_id: document.owner_id,
            labels: document.labels,
            sampling_period: document.sampling_period,
            scaler,
            selector,
            model,
        }))
    }

    /// Id of the stored classifier of (sensor, owner), without decoding it
    pub fn find_id(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Option<String>, ClassifierError> {
        Ok(self
            .store
            .find_one(sensor_id, owner_id)?
            .and_then(|document| document.id))
    }

    /// Delete a stored classifier by id
    pub fn delete(&self, classifier_id: &str) -> Result<bool, ClassifierError> {
        let removed = self.store.delete(classifier_id)?;
        if removed {
            info!("Deleted classifier {}", classifier_id);
        }
        Ok(removed)
    }

    /// Raw stored document for (sensor, owner)
    pub fn document(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<Option<ClassifierDocument>, ClassifierError> {
        Ok(self.store.find_one(sensor_id, owner_id)?)
    }
}
