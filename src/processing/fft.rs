//! FFT computation using rustfft
//!
//! Windows are transformed at their natural length (no zero padding) so that
//! bin `k` sits exactly at `k * fs / n`.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::{FrequencySpectrum, ProcessingError};

/// Compute the one-sided magnitude spectrum of `samples`.
///
/// Keeps the first `n / 2` bins. The dominant frequency is the first
/// maximum after the DC bin.
pub fn compute_spectrum(
    samples: &[f64],
    sample_rate: f64,
) -> Result<FrequencySpectrum, ProcessingError> {
    if samples.is_empty() {
        return Err(ProcessingError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    let processor = FftProcessor::new(samples.len(), sample_rate)?;
    processor.compute(samples)
}

/// FFT processor with a pre-planned transform for repeated computation.
///
/// The feature extractor transforms every channel of a window at the same
/// length, so one plan serves all channels.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f64>>,
    size: usize,
    sampling_rate: f64,
}

impl FftProcessor {
    pub fn new(size: usize, sampling_rate: f64) -> Result<Self, ProcessingError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(ProcessingError::InvalidSamplingRate(sampling_rate));
        }
        if size == 0 {
            return Err(ProcessingError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        Ok(Self {
            fft,
            size,
            sampling_rate,
        })
    }

    /// Transform a real signal of exactly `size()` samples.
    pub fn compute(&self, signal: &[f64]) -> Result<FrequencySpectrum, ProcessingError> {
        if signal.len() < self.size {
            return Err(ProcessingError::InsufficientData {
                needed: self.size,
                available: signal.len(),
            });
        }

        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .take(self.size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        let n_bins = self.size / 2;
        let frequencies = self.frequency_bins();
        let magnitudes: Vec<f64> = buffer.iter().take(n_bins).map(|c| c.norm()).collect();

        let dominant_frequency = dominant_bin(&magnitudes)
            .and_then(|i| frequencies.get(i).copied())
            .unwrap_or(0.0);

        Ok(FrequencySpectrum {
            frequencies,
            magnitudes,
            dominant_frequency,
            sample_rate: self.sampling_rate,
        })
    }

    /// Frequency of each kept bin.
    pub fn frequency_bins(&self) -> Vec<f64> {
        let resolution = self.frequency_resolution();
        (0..self.size / 2).map(|i| i as f64 * resolution).collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hz per bin
    pub fn frequency_resolution(&self) -> f64 {
        self.sampling_rate / self.size as f64
    }
}

/// Index of the first maximum after DC, or `None` when the spectrum has no
/// energy or no non-DC bin.
fn dominant_bin(magnitudes: &[f64]) -> Option<usize> {
    let peak = magnitudes.iter().copied().fold(0.0_f64, f64::max);
    if magnitudes.len() < 2 || peak <= 0.0 {
        return None;
    }
    let mut best = 1;
    for (i, &m) in magnitudes.iter().enumerate().skip(2) {
        if m > magnitudes[best] {
            best = i;
        }
    }
    Some(best)
}
