//! Feature naming and schema fingerprints.

use serde::{Deserialize, Serialize};

use crate::types::ChannelId;

/// Per-channel features, in extraction order.
pub const CHANNEL_FEATURES: [&str; 23] = [
    // temporal
    "mean",
    "std",
    "min",
    "max",
    "range",
    "median",
    "mad",
    "rms",
    "abs_energy",
    "abs_sum",
    // frequency
    "dominant_freq",
    "spectral_energy",
    "spectral_entropy",
    "spectral_mean",
    "spectral_std",
    "spectral_max",
    // statistical
    "skewness",
    "kurtosis",
    "q25",
    "q75",
    "iqr",
    "zero_crossing",
    "mean_crossing",
];

pub const ACC_MAGNITUDE_FEATURES: [&str; 3] =
    ["acc_magnitude_mean", "acc_magnitude_std", "acc_magnitude_max"];

pub const GYR_MAGNITUDE_FEATURES: [&str; 3] =
    ["gyr_magnitude_mean", "gyr_magnitude_std", "gyr_magnitude_max"];

pub const CORRELATION_FEATURES: [&str; 3] = ["corr_acc_xy", "corr_acc_xz", "corr_acc_yz"];

/// Ordered feature names plus the MD5 fingerprint of the newline-joined names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
    fingerprint: String,
}

impl FeatureSchema {
    /// Schema produced for a window with or without gyroscope channels.
    pub fn for_layout(include_gyro: bool) -> Self {
        let channels: &[ChannelId] = if include_gyro {
            &ChannelId::ALL
        } else {
            &ChannelId::ACCELEROMETER
        };

        let mut names: Vec<String> = channels
            .iter()
            .flat_map(|ch| {
                CHANNEL_FEATURES
                    .iter()
                    .map(move |f| format!("{}_{}", ch.as_str(), f))
            })
            .collect();
        names.extend(ACC_MAGNITUDE_FEATURES.iter().map(|s| s.to_string()));
        if include_gyro {
            names.extend(GYR_MAGNITUDE_FEATURES.iter().map(|s| s.to_string()));
        }
        names.extend(CORRELATION_FEATURES.iter().map(|s| s.to_string()));

        Self::from_names(names)
    }

    /// The two schemas the extractor can emit: six-channel first.
    pub fn known_layouts() -> [Self; 2] {
        [Self::for_layout(true), Self::for_layout(false)]
    }

    pub fn from_names(names: Vec<String>) -> Self {
        let fingerprint = fingerprint_of(&names);
        Self { names, fingerprint }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn includes_gyro(&self) -> bool {
        self.names.iter().any(|n| n.starts_with("gyr_"))
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Lowercase hex MD5 of the names joined with `\n`.
pub fn fingerprint_of(names: &[String]) -> String {
    format!("{:x}", md5::compute(names.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_sizes() {
        assert_eq!(FeatureSchema::for_layout(true).len(), 147);
        assert_eq!(FeatureSchema::for_layout(false).len(), 75);
    }

    #[test]
    fn test_schema_order() {
        let schema = FeatureSchema::for_layout(true);
        let names = schema.names();
        assert_eq!(names[0], "acc_x_mean");
        assert_eq!(names[22], "acc_x_mean_crossing");
        assert_eq!(names[23], "acc_y_mean");
        assert_eq!(names[138], "acc_magnitude_mean");
        assert_eq!(names[141], "gyr_magnitude_mean");
        assert_eq!(names[146], "corr_acc_yz");
    }

    #[test]
    fn test_accelerometer_schema_has_no_gyro_fields() {
        let schema = FeatureSchema::for_layout(false);
        assert!(!schema.includes_gyro());
        assert!(schema.names().iter().all(|n| !n.contains("gyr")));
        assert_eq!(schema.names()[72], "corr_acc_xy");
    }

    #[test]
    fn test_fingerprint_is_md5_of_joined_names() {
        let names = vec!["a".to_string(), "b".to_string()];
        // md5("a\nb")
        assert_eq!(fingerprint_of(&names), format!("{:x}", md5::compute("a\nb")));
        assert_eq!(fingerprint_of(&names).len(), 32);
    }

    #[test]
    fn test_layouts_have_distinct_fingerprints() {
        let [six, three] = FeatureSchema::known_layouts();
        assert_ne!(six.fingerprint(), three.fingerprint());
        assert_eq!(six, FeatureSchema::from_names(six.names().to_vec()));
    }
}
