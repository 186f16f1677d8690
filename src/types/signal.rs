//! Raw multi-channel IMU window.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tolerance on the timestamp step (seconds).
const TIMESTAMP_TOLERANCE_S: f64 = 1e-6;

/// Sensor channel, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    AccX,
    AccY,
    AccZ,
    GyrX,
    GyrY,
    GyrZ,
}

impl ChannelId {
    pub const ACCELEROMETER: [Self; 3] = [Self::AccX, Self::AccY, Self::AccZ];
    pub const GYROSCOPE: [Self; 3] = [Self::GyrX, Self::GyrY, Self::GyrZ];
    pub const ALL: [Self; 6] = [
        Self::AccX,
        Self::AccY,
        Self::AccZ,
        Self::GyrX,
        Self::GyrY,
        Self::GyrZ,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccX => "acc_x",
            Self::AccY => "acc_y",
            Self::AccZ => "acc_z",
            Self::GyrX => "gyr_x",
            Self::GyrY => "gyr_y",
            Self::GyrZ => "gyr_z",
        }
    }

    pub const fn is_gyroscope(self) -> bool {
        matches!(self, Self::GyrX | Self::GyrY | Self::GyrZ)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when assembling a `RawSignal`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("Channel {channel} has {actual} samples, expected {expected}")]
    LengthMismatch {
        channel: ChannelId,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate channel: {0}")]
    DuplicateChannel(ChannelId),

    #[error("Timestamps must be strictly increasing with step 1/fs (violation at index {index})")]
    IrregularTimestamps { index: usize },
}

/// A window of sensor samples at a fixed sampling rate.
///
/// Channels are kept in canonical order. Either the three accelerometer axes
/// or all six channels are normally present, but partial sets are accepted
/// here so that downstream consumers can report exactly what is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSignalRecord")]
pub struct RawSignal {
    sampling_rate: f64,
    timestamps: Vec<f64>,
    channels: Vec<(ChannelId, Vec<f64>)>,
}

/// Unvalidated wire form; deserialization goes through `RawSignal::new`.
#[derive(Deserialize)]
struct RawSignalRecord {
    sampling_rate: f64,
    timestamps: Vec<f64>,
    channels: Vec<(ChannelId, Vec<f64>)>,
}

impl TryFrom<RawSignalRecord> for RawSignal {
    type Error = SignalError;

    fn try_from(record: RawSignalRecord) -> Result<Self, Self::Error> {
        Self::new(record.sampling_rate, record.timestamps, record.channels)
    }
}

impl RawSignal {
    /// Build a signal with timestamps `t_i = i / sampling_rate`.
    pub fn from_channels(
        sampling_rate: f64,
        channels: Vec<(ChannelId, Vec<f64>)>,
    ) -> Result<Self, SignalError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(SignalError::InvalidSamplingRate(sampling_rate));
        }
        let len = channels.first().map_or(0, |(_, v)| v.len());
        let timestamps = (0..len).map(|i| i as f64 / sampling_rate).collect();
        Self::new(sampling_rate, timestamps, channels)
    }

    /// Build a signal with explicit timestamps, validating every invariant.
    pub fn new(
        sampling_rate: f64,
        timestamps: Vec<f64>,
        mut channels: Vec<(ChannelId, Vec<f64>)>,
    ) -> Result<Self, SignalError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(SignalError::InvalidSamplingRate(sampling_rate));
        }

        channels.sort_by_key(|(id, _)| *id);
        for pair in channels.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(SignalError::DuplicateChannel(pair[0].0));
            }
        }

        for (id, values) in &channels {
            if values.len() != timestamps.len() {
                return Err(SignalError::LengthMismatch {
                    channel: *id,
                    expected: timestamps.len(),
                    actual: values.len(),
                });
            }
        }

        let step = 1.0 / sampling_rate;
        for (i, pair) in timestamps.windows(2).enumerate() {
            let dt = pair[1] - pair[0];
            if !dt.is_finite() || dt <= 0.0 || (dt - step).abs() > TIMESTAMP_TOLERANCE_S {
                return Err(SignalError::IrregularTimestamps { index: i + 1 });
            }
        }

        Ok(Self {
            sampling_rate,
            timestamps,
            channels,
        })
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Samples of one channel, if present.
    pub fn channel(&self, id: ChannelId) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, v)| v.as_slice())
    }

    /// Present channels in canonical order.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|(id, _)| *id).collect()
    }

    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, &[f64])> {
        self.channels.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn has_gyroscope(&self) -> bool {
        self.channels.iter().any(|(id, _)| id.is_gyroscope())
    }

    /// Time of the last sample, 0 for an empty window.
    pub fn duration(&self) -> f64 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Copy of this window with the gyroscope channels removed.
    pub fn accelerometer_only(&self) -> Self {
        Self {
            sampling_rate: self.sampling_rate,
            timestamps: self.timestamps.clone(),
            channels: self
                .channels
                .iter()
                .filter(|(id, _)| !id.is_gyroscope())
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(n: usize) -> Vec<(ChannelId, Vec<f64>)> {
        ChannelId::ACCELEROMETER
            .iter()
            .map(|&id| (id, vec![0.0; n]))
            .collect()
    }

    #[test]
    fn test_from_channels_builds_timestamps() {
        let signal = RawSignal::from_channels(50.0, acc(100)).unwrap();
        assert_eq!(signal.len(), 100);
        assert!((signal.timestamps()[1] - 0.02).abs() < 1e-12);
        assert!((signal.duration() - 99.0 / 50.0).abs() < 1e-12);
        assert!(!signal.has_gyroscope());
    }

    #[test]
    fn test_channels_are_sorted() {
        let channels = vec![
            (ChannelId::AccZ, vec![3.0]),
            (ChannelId::AccX, vec![1.0]),
            (ChannelId::AccY, vec![2.0]),
        ];
        let signal = RawSignal::from_channels(10.0, channels).unwrap();
        assert_eq!(signal.channel_ids(), ChannelId::ACCELEROMETER.to_vec());
        assert_eq!(signal.channel(ChannelId::AccZ), Some(&[3.0][..]));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let mut channels = acc(10);
        channels[1].1.pop();
        let err = RawSignal::from_channels(10.0, channels).unwrap_err();
        assert!(matches!(err, SignalError::LengthMismatch { channel: ChannelId::AccY, .. }));
    }

    #[test]
    fn test_rejects_bad_sampling_rate() {
        assert!(RawSignal::from_channels(0.0, acc(4)).is_err());
        assert!(RawSignal::from_channels(f64::NAN, acc(4)).is_err());
    }

    #[test]
    fn test_rejects_irregular_timestamps() {
        let timestamps = vec![0.0, 0.1, 0.25];
        let err = RawSignal::new(10.0, timestamps, acc(3)).unwrap_err();
        assert_eq!(err, SignalError::IrregularTimestamps { index: 2 });
    }

    #[test]
    fn test_rejects_duplicate_channel() {
        let mut channels = acc(2);
        channels.push((ChannelId::AccX, vec![0.0; 2]));
        assert!(matches!(
            RawSignal::from_channels(10.0, channels),
            Err(SignalError::DuplicateChannel(ChannelId::AccX))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"sampling_rate":10.0,"timestamps":[0.0,0.1],"channels":[["acc_x",[1.0,2.0]]]}"#;
        let signal: RawSignal = serde_json::from_str(ok).unwrap();
        assert_eq!(signal.len(), 2);

        let bad = r#"{"sampling_rate":10.0,"timestamps":[0.0,0.1],"channels":[["acc_x",[1.0]]]}"#;
        assert!(serde_json::from_str::<RawSignal>(bad).is_err());
    }

    #[test]
    fn test_accelerometer_only() {
        let channels = ChannelId::ALL.iter().map(|&id| (id, vec![1.0; 5])).collect();
        let signal = RawSignal::from_channels(10.0, channels).unwrap();
        assert!(signal.has_gyroscope());
        let acc = signal.accelerometer_only();
        assert_eq!(acc.channel_count(), 3);
        assert!(!acc.has_gyroscope());
    }
}
