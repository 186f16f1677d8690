//! Feature extraction: raw IMU window → fixed-schema feature vector
//!
//! 23 features per channel (temporal, spectral, statistical) followed by
//! cross-channel magnitude and correlation features. Six-channel windows
//! produce 147 features, accelerometer-only windows 75.

mod extractor;
mod schema;

pub use extractor::*;
pub use schema::*;

use thiserror::Error;

use crate::types::ChannelId;

/// Errors raised by feature extraction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Missing channel '{0}'")]
    MissingChannel(ChannelId),
}
