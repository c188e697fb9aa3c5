//! Feature Engineering Engine
//!
//! Turns a multi-channel, multi-rate time window into a fixed-width
//! feature vector (eight statistics per channel).

mod features;
mod statistics;

pub use features::{FeatureConfig, FeatureExtractor, FeatureVector, RangeMode, FEATURES_PER_CHANNEL};
pub use statistics::{median, peak_count, std_dev, zero_crossings, ChannelStatistics};

use thiserror::Error;

/// Errors during feature extraction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// The window cannot be summarized (empty channel, no channels, NaN readings)
    #[error("Malformed window: {0}")]
    MalformedWindow(String),
}
