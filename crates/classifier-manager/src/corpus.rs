//! Training-Set Assembly

use crate::ClassifierError;
use std::sync::Arc;
use storage::{MetadataStore, TelemetrySource};
use tracing::{debug, info};

/// One labeled window: a ragged sequence of readings per input channel
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledWindow {
    pub timeseries: Vec<Vec<f64>>,
    pub label: String,
}

/// Training corpus for one (sensor, owner)
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingCorpus {
    pub examples: Vec<LabeledWindow>,
    /// Distinct labels in first-seen order
    pub labels: Vec<String>,
    /// Mean sample duration (seconds)
    pub sampling_period: f64,
}

impl TrainingCorpus {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Builds training corpora from stored samples and telemetry
#[derive(Clone)]
pub struct CorpusAssembler {
    metadata: Arc<dyn MetadataStore>,
    telemetry: Arc<dyn TelemetrySource>,
}

impl CorpusAssembler {
    pub fn new(metadata: Arc<dyn MetadataStore>, telemetry: Arc<dyn TelemetrySource>) -> Self {
        Self { metadata, telemetry }
    }

    /// Fetch every sample of the sensor and the readings behind it.
    ///
    /// Any failed fetch aborts the whole build.
    pub fn build_corpus(
        &self,
        sensor_id: &str,
        owner_id: &str,
    ) -> Result<TrainingCorpus, ClassifierError> {
        let samples = self.metadata.samples(sensor_id, owner_id)?;
        if samples.is_empty() {
            return Err(ClassifierError::NoSamples(sensor_id.to_string()));
        }

        let mut examples = Vec::with_capacity(samples.len());
        let mut labels: Vec<String> = Vec::new();
        let mut duration_sum = 0.0;

        for sample in &samples {
            let sensor = self
                .metadata
                .sensor(&sample.sensor_id, owner_id)?
                .ok_or_else(|| ClassifierError::NotFound(format!("sensor {}", sample.sensor_id)))?;

            let timeseries = self.fetch_window(&sensor.inputs, sample.start_time, sample.end_time)?;
            duration_sum += sample.duration();

            if !labels.contains(&sample.label) {
                labels.push(sample.label.clone());
            }
            examples.push(LabeledWindow {
                timeseries,
                label: sample.label.clone(),
            });
        }

        let sampling_period = duration_sum / samples.len() as f64;
        info!(
            "Built corpus for sensor {}: {} samples, {} labels, sampling period {:.3}s",
            sensor_id,
            examples.len(),
            labels.len(),
            sampling_period
        );

        Ok(TrainingCorpus {
            examples,
            labels,
            sampling_period,
        })
    }

    /// Readings of each input channel over `[start, end]`, in input order
    pub fn fetch_window(
        &self,
        inputs: &[String],
        start: f64,
        end: f64,
    ) -> Result<Vec<Vec<f64>>, ClassifierError> {
        debug!("Fetching {} channels over [{}, {}]", inputs.len(), start, end);
        inputs
            .iter()
            .map(|channel| {
                self.telemetry
                    .get_readings(channel, start, end)
                    .map_err(|source| ClassifierError::Upstream {
                        channel: channel.clone(),
                        source,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_sampling_period_is_mean_duration() {
        let fixture = Fixture::new();
        let sensor_id = fixture.sensor(&["temp"]);
        fixture.flat("temp", 0.0, 100.0, 1.0);
        fixture.sample(&sensor_id, 0.0, 10.0, "idle");
        fixture.sample(&sensor_id, 20.0, 40.0, "motion");

        let corpus = fixture.assembler().build_corpus(&sensor_id, Fixture::OWNER).unwrap();
        assert_eq!(corpus.sampling_period, 15.0);
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_labels_in_first_seen_order() {
        let fixture = Fixture::new();
        let sensor_id = fixture.sensor(&["temp"]);
        fixture.flat("temp", 0.0, 100.0, 1.0);
        fixture.sample(&sensor_id, 0.0, 5.0, "motion");
        fixture.sample(&sensor_id, 5.0, 10.0, "idle");
        fixture.sample(&sensor_id, 10.0, 15.0, "motion");

        let corpus = fixture.assembler().build_corpus(&sensor_id, Fixture::OWNER).unwrap();
        assert_eq!(corpus.labels, vec!["motion", "idle"]);
        assert_eq!(corpus.examples[2].label, "motion");
    }

    #[test]
    fn test_one_ragged_series_per_channel() {
        let fixture = Fixture::new();
        let sensor_id = fixture.sensor(&["fast", "slow"]);
        fixture.flat("fast", 0.0, 10.0, 0.5);
        fixture.flat("slow", 0.0, 10.0, 2.0);
        fixture.sample(&sensor_id, 0.0, 10.0, "idle");

        let corpus = fixture.assembler().build_corpus(&sensor_id, Fixture::OWNER).unwrap();
        let window = &corpus.examples[0].timeseries;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].len(), 21);
        assert_eq!(window[1].len(), 6);
    }

    #[test]
    fn test_no_samples() {
        let fixture = Fixture::new();
        let sensor_id = fixture.sensor(&["temp"]);
        assert!(matches!(
            fixture.assembler().build_corpus(&sensor_id, Fixture::OWNER),
            Err(ClassifierError::NoSamples(_))
        ));
    }

    #[test]
    fn test_missing_channel_aborts_build() {
        let fixture = Fixture::new();
        let sensor_id = fixture.sensor(&["temp", "ghost"]);
        fixture.flat("temp", 0.0, 100.0, 1.0);
        fixture.sample(&sensor_id, 0.0, 10.0, "idle");

        match fixture.assembler().build_corpus(&sensor_id, Fixture::OWNER) {
            Err(ClassifierError::Upstream { channel, .. }) => assert_eq!(channel, "ghost"),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }
}
