//! Zero-phase Butterworth low-pass filtering.
//!
//! The 4th-order design is a cascade of two second-order sections (bilinear
//! transform with prewarping at the cutoff). `filtfilt` runs the cascade
//! forward and backward over an odd-reflected extension of the signal, with
//! each section started at its steady state for the edge value.

use std::f64::consts::PI;

use super::ProcessingError;

/// Quality factors of the two sections of a 4th-order Butterworth.
const BUTTERWORTH_4_Q: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_5];

/// Second-order IIR section, normalized so that `a0 = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    /// Low-pass section with quality factor `q`.
    pub fn lowpass(cutoff_hz: f64, sample_rate: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Filter in place (transposed direct form II) starting from the steady
    /// state for a constant input `initial`. Returns the constant output
    /// level that state corresponds to.
    fn run(&self, signal: &mut [f64], initial: f64) -> f64 {
        let gain = self.dc_gain();
        let mut z1 = (gain - self.b0) * initial;
        let mut z2 = (self.b2 - self.a2 * gain) * initial;

        for x in signal.iter_mut() {
            let input = *x;
            let y = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * y + z2;
            z2 = self.b2 * input - self.a2 * y;
            *x = y;
        }
        gain * initial
    }
}

/// 4th-order Butterworth low-pass as two cascaded biquads.
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthLowpass {
    sections: [Biquad; 2],
    cutoff_hz: f64,
    sample_rate: f64,
}

impl ButterworthLowpass {
    /// Design the filter. The cutoff must lie strictly inside (0, Nyquist).
    pub fn new(cutoff_hz: f64, sample_rate: f64) -> Result<Self, ProcessingError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ProcessingError::InvalidSamplingRate(sample_rate));
        }
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= sample_rate / 2.0 {
            return Err(ProcessingError::InvalidCutoff(cutoff_hz));
        }

        Ok(Self {
            sections: BUTTERWORTH_4_Q.map(|q| Biquad::lowpass(cutoff_hz, sample_rate, q)),
            cutoff_hz,
            sample_rate,
        })
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Default edge padding: three times the filter order plus one.
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Single causal pass.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = signal.to_vec();
        self.cascade(&mut out);
        out
    }

    /// Zero-phase forward-backward filtering.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }
        let pad = self.pad_len().min(n - 1);

        let first = signal[0];
        let last = signal[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.cascade(&mut ext);
        ext.reverse();
        self.cascade(&mut ext);
        ext.reverse();

        ext[pad..pad + n].to_vec()
    }

    fn cascade(&self, signal: &mut [f64]) {
        let Some(&first) = signal.first() else {
            return;
        };
        let mut level = first;
        for section in &self.sections {
            level = section.run(signal, level);
        }
    }
}
