//! Signal processing primitives - spectrum, filtering, peaks and descriptive statistics

mod fft;
mod filter;
mod peaks;
pub mod stats;

pub use fft::*;
pub use filter::*;
pub use peaks::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("Invalid cutoff frequency: {0} Hz")]
    InvalidCutoff(f64),
}

/// One-sided magnitude spectrum of a real signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencySpectrum {
    /// Frequency bins (Hz), the first `n / 2` DFT bins
    pub frequencies: Vec<f64>,
    /// Unscaled DFT magnitude at each bin
    pub magnitudes: Vec<f64>,
    /// Strongest non-DC frequency (Hz), 0 when the spectrum carries no energy
    pub dominant_frequency: f64,
    /// Sample rate used
    pub sample_rate: f64,
}
