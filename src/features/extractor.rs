//! Window feature extraction.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FeatureError, FeatureSchema};
use crate::processing::{stats, FftProcessor};
use crate::types::{ChannelId, RawSignal};

/// Feature values tagged with the schema that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Stateless extractor; deterministic for a given window.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the full feature vector of one window.
    ///
    /// Accelerometer channels are required. Gyroscope channels are optional
    /// but must come as a complete triple.
    pub fn extract(&self, signal: &RawSignal) -> Result<FeatureVector, FeatureError> {
        let acc = channel_triple(signal, ChannelId::ACCELEROMETER)?;
        let gyr = if ChannelId::GYROSCOPE
            .iter()
            .any(|&id| signal.channel(id).is_some())
        {
            Some(channel_triple(signal, ChannelId::GYROSCOPE)?)
        } else {
            None
        };

        let schema = FeatureSchema::for_layout(gyr.is_some());
        let mut values = Vec::with_capacity(schema.len());

        // One plan serves every channel of the window
        let fft = FftProcessor::new(signal.len(), signal.sampling_rate()).ok();

        for samples in acc.iter().chain(gyr.iter().flatten()) {
            push_channel_features(&mut values, samples, fft.as_ref());
        }

        push_magnitude_features(&mut values, &acc);
        if let Some(gyr) = &gyr {
            push_magnitude_features(&mut values, gyr);
        }

        values.push(stats::pearson(acc[0], acc[1]));
        values.push(stats::pearson(acc[0], acc[2]));
        values.push(stats::pearson(acc[1], acc[2]));

        debug_assert_eq!(values.len(), schema.len());
        Ok(FeatureVector { schema, values })
    }

    /// Extract many windows in parallel, preserving input order.
    pub fn extract_batch(&self, signals: &[RawSignal]) -> Vec<Result<FeatureVector, FeatureError>> {
        signals.par_iter().map(|s| self.extract(s)).collect()
    }
}

fn channel_triple<'a>(
    signal: &'a RawSignal,
    ids: [ChannelId; 3],
) -> Result<[&'a [f64]; 3], FeatureError> {
    let get = |id| signal.channel(id).ok_or(FeatureError::MissingChannel(id));
    Ok([get(ids[0])?, get(ids[1])?, get(ids[2])?])
}

fn push_channel_features(out: &mut Vec<f64>, x: &[f64], fft: Option<&FftProcessor>) {
    // temporal
    out.push(stats::mean(x));
    out.push(stats::std_dev(x));
    out.push(stats::min(x));
    out.push(stats::max(x));
    out.push(stats::range(x));
    out.push(stats::median(x));
    out.push(stats::mean_abs_deviation(x));
    out.push(stats::rms(x));
    out.push(x.iter().map(|v| v * v).sum());
    out.push(x.iter().map(|v| v.abs()).sum());

    // frequency
    let (dominant, magnitudes) = match fft.map(|p| p.compute(x)) {
        Some(Ok(spectrum)) => (spectrum.dominant_frequency, spectrum.magnitudes),
        _ => (0.0, Vec::new()),
    };
    let power: Vec<f64> = magnitudes.iter().map(|m| m * m).collect();
    let energy: f64 = power.iter().sum();
    let entropy = if energy > 0.0 {
        -power
            .iter()
            .map(|p| p / energy)
            .filter(|&p| p > 0.0)
            .map(|p| p * p.log2())
            .sum::<f64>()
    } else {
        0.0
    };
    out.push(dominant);
    out.push(energy);
    out.push(entropy);
    out.push(stats::mean(&magnitudes));
    out.push(stats::std_dev(&magnitudes));
    out.push(stats::max(&magnitudes));

    // statistical
    let q25 = stats::percentile(x, 25.0);
    let q75 = stats::percentile(x, 75.0);
    out.push(stats::skewness(x));
    out.push(stats::kurtosis(x));
    out.push(q25);
    out.push(q75);
    out.push(q75 - q25);
    out.push(stats::sign_changes(x) as f64);
    out.push(stats::mean_crossings(x) as f64);
}

fn push_magnitude_features(out: &mut Vec<f64>, [x, y, z]: &[&[f64]; 3]) {
    let magnitude: Vec<f64> = x
        .iter()
        .zip(y.iter())
        .zip(z.iter())
        .map(|((a, b), c)| (a * a + b * b + c * c).sqrt())
        .collect();
    out.push(stats::mean(&magnitude));
    out.push(stats::std_dev(&magnitude));
    out.push(stats::max(&magnitude));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const FS: f64 = 50.0;

    fn sine(freq: f64, amp: f64, offset: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| offset + amp * (2.0 * PI * freq * i as f64 / FS).sin())
            .collect()
    }

    fn window(include_gyro: bool) -> RawSignal {
        let n = 500;
        let mut channels = vec![
            (ChannelId::AccX, sine(0.5, 1.0, 0.0, n)),
            (ChannelId::AccY, sine(1.0, 4.0, -9.81, n)),
            (ChannelId::AccZ, sine(2.0, 2.0, 0.0, n)),
        ];
        if include_gyro {
            channels.push((ChannelId::GyrX, sine(1.0, 0.3, 0.0, n)));
            channels.push((ChannelId::GyrY, sine(1.0, 0.15, 0.0, n)));
            channels.push((ChannelId::GyrZ, sine(1.0, 0.09, 0.0, n)));
        }
        RawSignal::from_channels(FS, channels).unwrap()
    }

    #[test]
    fn test_six_channel_vector() {
        let v = FeatureExtractor::new().extract(&window(true)).unwrap();
        assert_eq!(v.len(), 147);
        assert_eq!(v.schema(), &FeatureSchema::for_layout(true));
        assert!(v.values().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_three_channel_vector_has_no_gyro_fields() {
        let v = FeatureExtractor::new().extract(&window(false)).unwrap();
        assert_eq!(v.len(), 75);
        assert!(v.get("gyr_magnitude_mean").is_none());
        assert!(v.iter().all(|(name, _)| !name.starts_with("gyr")));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let signal = window(true);
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.extract(&signal), extractor.extract(&signal));
    }

    #[test]
    fn test_known_values_on_sine() {
        let v = FeatureExtractor::new().extract(&window(true)).unwrap();
        let get = |n: &str| v.get(n).unwrap();

        assert!((get("acc_y_mean") + 9.81).abs() < 1e-9);
        assert!((get("acc_y_std") - 4.0 / 2f64.sqrt()).abs() < 1e-6);
        assert!((get("acc_y_dominant_freq") - 1.0).abs() < 1e-9);
        assert!((get("acc_z_dominant_freq") - 2.0).abs() < 1e-9);
        assert!((get("acc_y_iqr") - (get("acc_y_q75") - get("acc_y_q25"))).abs() < 1e-12);
        // 10 full cycles: two mean crossings per cycle
        let crossings = get("acc_y_mean_crossing");
        assert!((18.0..=21.0).contains(&crossings), "crossings = {crossings}");
        // Offset sine never crosses zero
        assert_eq!(get("acc_y_zero_crossing"), 0.0);
    }

    #[test]
    fn test_constant_signal_gives_zero_moments() {
        let n = 100;
        let signal = RawSignal::from_channels(
            FS,
            ChannelId::ACCELEROMETER
                .iter()
                .map(|&id| (id, vec![1.5; n]))
                .collect(),
        )
        .unwrap();
        let v = FeatureExtractor::new().extract(&signal).unwrap();
        assert!(v.get("acc_x_std").unwrap().abs() < 1e-12);
        assert_eq!(v.get("acc_x_skewness"), Some(0.0));
        assert_eq!(v.get("acc_x_kurtosis"), Some(0.0));
        assert_eq!(v.get("acc_x_zero_crossing"), Some(0.0));
        assert_eq!(v.get("corr_acc_xy"), Some(0.0));
    }

    #[test]
    fn test_missing_accelerometer_channel() {
        let signal = RawSignal::from_channels(
            FS,
            vec![
                (ChannelId::AccX, vec![0.0; 10]),
                (ChannelId::AccZ, vec![0.0; 10]),
            ],
        )
        .unwrap();
        assert_eq!(
            FeatureExtractor::new().extract(&signal),
            Err(FeatureError::MissingChannel(ChannelId::AccY))
        );
    }

    #[test]
    fn test_incomplete_gyroscope_triple() {
        let mut channels: Vec<_> = ChannelId::ACCELEROMETER
            .iter()
            .map(|&id| (id, vec![0.0; 10]))
            .collect();
        channels.push((ChannelId::GyrX, vec![0.0; 10]));
        let signal = RawSignal::from_channels(FS, channels).unwrap();
        assert_eq!(
            FeatureExtractor::new().extract(&signal),
            Err(FeatureError::MissingChannel(ChannelId::GyrY))
        );
    }

    #[test]
    fn test_batch_preserves_order() {
        let signals = vec![window(true), window(false)];
        let results = FeatureExtractor::new().extract_batch(&signals);
        assert_eq!(results[0].as_ref().unwrap().len(), 147);
        assert_eq!(results[1].as_ref().unwrap().len(), 75);
    }
}
