//! Feature Vector Assembly

use crate::statistics::ChannelStatistics;
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features emitted per input channel
pub const FEATURES_PER_CHANNEL: usize = 8;

/// Which channel's range fills the eighth feature slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    /// Slot 8 of channel `i` holds the range of channel `i - 1`.
    ///
    /// Slots are filled in channel order, so channel 0 reads the last
    /// channel's slot before it has been written: the value is 0 for
    /// multi-channel windows and the channel's own range for a
    /// single-channel window. Trained models depend on this layout.
    #[default]
    PreviousChannel,
    /// Slot 8 holds the channel's own range
    SameChannel,
}

/// Feature extraction configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Source of the range feature
    pub range_mode: RangeMode,
}

/// Feature vector for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Flat values, `FEATURES_PER_CHANNEL` per channel in channel order
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Number of features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the vector is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of channels the vector summarizes
    pub fn channel_count(&self) -> usize {
        self.values.len() / FEATURES_PER_CHANNEL
    }

    /// Borrow the features of one channel
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        let start = index * FEATURES_PER_CHANNEL;
        self.values.get(start..start + FEATURES_PER_CHANNEL)
    }

    /// Borrow the flat values
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Feature extractor for multi-channel windows
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extractor configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract features from a window of ragged channels.
    ///
    /// Per channel, in order: mean, std dev, peak count, median, min, max,
    /// zero crossings, range (see [`RangeMode`]).
    pub fn extract<C: AsRef<[f64]>>(&self, window: &[C]) -> Result<FeatureVector, FeatureError> {
        let channel_count = window.len();
        if channel_count == 0 {
            return Err(FeatureError::MalformedWindow(
                "window has no channels".to_string(),
            ));
        }

        let mut rows = vec![[0.0; FEATURES_PER_CHANNEL]; channel_count];

        for (idx, channel) in window.iter().enumerate() {
            let readings = channel.as_ref();
            let stats = ChannelStatistics::compute(readings).map_err(|e| match e {
                FeatureError::MalformedWindow(reason) => {
                    FeatureError::MalformedWindow(format!("channel {}: {}", idx, reason))
                }
            })?;

            let row = &mut rows[idx];
            row[0] = stats.mean;
            row[1] = stats.std_dev;
            row[2] = stats.peak_count as f64;
            row[3] = stats.median;
            row[4] = stats.min;
            row[5] = stats.max;
            row[6] = stats.zero_crossings as f64;

            let range = match self.config.range_mode {
                RangeMode::PreviousChannel => {
                    let prev = (idx + channel_count - 1) % channel_count;
                    rows[prev][5] - rows[prev][4]
                }
                RangeMode::SameChannel => stats.range(),
            };
            rows[idx][7] = range;
        }

        debug!(
            "Extracted {} features from {} channels",
            channel_count * FEATURES_PER_CHANNEL,
            channel_count
        );

        Ok(FeatureVector {
            values: rows.into_iter().flatten().collect(),
        })
    }
}
