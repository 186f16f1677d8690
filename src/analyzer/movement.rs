//! Repetition counting, regularity and composite score.

use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::processing::{find_peaks, moving_average, stats, PeakCriteria};
use crate::types::{
    AnalysisResult, ChannelId, ExerciseId, RawSignal, RepChannel, UnsupportedExerciseError,
};

/// Scores one window against its declared exercise.
#[derive(Debug, Clone, Default)]
pub struct MovementAnalyzer {
    config: AnalyzerConfig,
}

impl MovementAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Resolve `exercise` (aliases accepted) and analyze.
    pub fn analyze_named(
        &self,
        signal: &RawSignal,
        exercise: &str,
    ) -> Result<AnalysisResult, UnsupportedExerciseError> {
        Ok(self.analyze(signal, ExerciseId::resolve(exercise)?))
    }

    /// Analyze a window. Never fails: degenerate input yields zeros or the
    /// neutral defaults, and every field is finite.
    pub fn analyze(&self, signal: &RawSignal, exercise: ExerciseId) -> AnalysisResult {
        if signal.is_empty() {
            debug!(exercise = %exercise, "Empty window, nothing to analyze");
            return AnalysisResult::empty(exercise);
        }

        let [x, y, z] = ChannelId::ACCELEROMETER.map(|id| match signal.channel(id) {
            Some(samples) => sanitize(samples),
            None => {
                debug!(channel = %id, "Accelerometer channel missing, treating as zero");
                vec![0.0; signal.len()]
            }
        });
        let magnitude: Vec<f64> = x
            .iter()
            .zip(&y)
            .zip(&z)
            .map(|((a, b), c)| (a * a + b * b + c * c).sqrt())
            .collect();

        let archetype = exercise.archetype();
        let repetitions = if archetype.isometric {
            1
        } else {
            let channel = match archetype.rep_channel {
                RepChannel::Vertical => &y,
                RepChannel::Depth => &z,
                RepChannel::Magnitude => &magnitude,
            };
            self.peaks(channel).len() as u32
        };

        let regularity = self.regularity(&magnitude, archetype.isometric);
        let amplitude = stats::range(&magnitude);
        let amplitude_component = (amplitude / self.config.amplitude_reference).min(1.0) * 100.0;
        let score = (self.config.regularity_weight * regularity
            + self.config.amplitude_weight * amplitude_component)
            .clamp(0.0, 100.0);

        let duration = match signal.duration() {
            d if d.is_finite() && d > 0.0 => d,
            _ => 0.0,
        };
        let speed = if duration > 0.0 {
            f64::from(repetitions) / duration * 60.0
        } else {
            0.0
        };

        AnalysisResult {
            exercise,
            repetitions,
            duration: stats::round_to(duration, 1),
            regularity: stats::round_to(regularity, 1),
            score: stats::round_to(score, 1),
            speed: stats::round_to(speed, 1),
            amplitude: stats::round_to(amplitude, 2),
        }
    }

    fn peaks(&self, samples: &[f64]) -> Vec<usize> {
        let smoothed = moving_average(samples, self.config.smoothing_window);
        find_peaks(
            &smoothed,
            &PeakCriteria {
                min_distance: self.config.min_peak_distance.max(1),
                min_prominence: Some(self.config.min_prominence),
            },
        )
    }

    /// 0-100; holds are scored on steadiness, dynamic sets on the spread of
    /// intervals between magnitude peaks.
    fn regularity(&self, magnitude: &[f64], isometric: bool) -> f64 {
        if isometric {
            let penalty = self.config.isometric_std_penalty * stats::std_dev(magnitude);
            return (100.0 - penalty).clamp(0.0, 100.0);
        }

        let peaks = self.peaks(magnitude);
        if peaks.len() < 2 {
            return self.config.neutral_regularity;
        }
        let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        let cv = stats::coefficient_of_variation(&intervals);
        (100.0 - 100.0 * cv).clamp(0.0, 100.0)
    }
}

/// Forward-fill non-finite samples; leading gaps become 0.
fn sanitize(samples: &[f64]) -> Vec<f64> {
    let mut last = 0.0;
    samples
        .iter()
        .map(|&v| {
            if v.is_finite() {
                last = v;
            }
            last
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const FS: f64 = 50.0;
    const G: f64 = 9.81;

    fn window(y: Vec<f64>) -> RawSignal {
        let n = y.len();
        RawSignal::from_channels(
            FS,
            vec![
                (ChannelId::AccX, vec![0.0; n]),
                (ChannelId::AccY, y),
                (ChannelId::AccZ, vec![0.0; n]),
            ],
        )
        .unwrap()
    }

    /// Vertical oscillation made of one sine cycle per entry of `periods`.
    fn cycles(periods: &[usize], amplitude: f64) -> Vec<f64> {
        periods
            .iter()
            .flat_map(|&p| (0..p).map(move |j| -G + amplitude * (2.0 * PI * j as f64 / p as f64).sin()))
            .collect()
    }

    #[test]
    fn test_periodic_signal_rep_count() {
        let analyzer = MovementAnalyzer::default();
        let result = analyzer.analyze(&window(cycles(&[50; 10], 5.0)), ExerciseId::Squat);
        assert!(
            (9..=11).contains(&result.repetitions),
            "repetitions = {}",
            result.repetitions
        );
        assert!(result.regularity > 95.0, "regularity = {}", result.regularity);
        assert!((result.duration - 10.0).abs() < 0.05);
        assert!((result.speed - result.repetitions as f64 / 9.98 * 60.0).abs() < 0.1);
    }

    #[test]
    fn test_smoothing_suppresses_sensor_noise_peaks() {
        use crate::processing::ButterworthLowpass;
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use rand_distr::StandardNormal;

        // 8 slow reps (2.5 s each) with the synthesizer's sensor noise
        let filter = ButterworthLowpass::new(20.0, FS).unwrap();
        let raw_only = MovementAnalyzer::new(AnalyzerConfig {
            smoothing_window: 1,
            ..AnalyzerConfig::default()
        });
        for seed in [1, 2, 3] {
            let mut rng = StdRng::seed_from_u64(seed);
            let noisy: Vec<f64> = cycles(&[125; 8], 8.0)
                .into_iter()
                .map(|v| v + 0.5 * rng.sample::<f64, _>(StandardNormal))
                .collect();
            let signal = window(filter.filtfilt(&noisy));

            let smoothed = MovementAnalyzer::default().analyze(&signal, ExerciseId::Squat);
            assert!(
                (7..=9).contains(&smoothed.repetitions),
                "seed {seed}: smoothed count {}",
                smoothed.repetitions
            );
            let raw = raw_only.analyze(&signal, ExerciseId::Squat);
            assert!(raw.repetitions > 10, "seed {seed}: raw count {}", raw.repetitions);
        }
    }

    #[test]
    fn test_regular_beats_jittered() {
        let analyzer = MovementAnalyzer::default();
        let regular = analyzer.analyze(&window(cycles(&[60; 9], 5.0)), ExerciseId::Squat);
        let jittered = analyzer.analyze(
            &window(cycles(&[40, 100, 45, 95, 50, 110, 40, 90, 70], 5.0)),
            ExerciseId::Squat,
        );
        assert!(
            regular.regularity > jittered.regularity,
            "regular {} vs jittered {}",
            regular.regularity,
            jittered.regularity
        );
    }

    #[test]
    fn test_score_formula() {
        let analyzer = MovementAnalyzer::default();
        let result = analyzer.analyze(&window(cycles(&[50; 10], 5.0)), ExerciseId::Squat);
        // magnitude spans 9.81 ± 5
        assert!((result.amplitude - 10.0).abs() < 0.05, "amplitude = {}", result.amplitude);
        let expected = 0.6 * result.regularity + 0.4 * (10.0 / 15.0) * 100.0;
        assert!((result.score - expected).abs() < 0.2);
    }

    #[test]
    fn test_isometric_hold() {
        let analyzer = MovementAnalyzer::default();
        let y: Vec<f64> = (0..500).map(|i| -G + 0.05 * (i as f64 * 0.7).sin()).collect();
        let result = analyzer.analyze(&window(y), ExerciseId::Plank);
        assert_eq!(result.repetitions, 1);
        assert!(result.regularity >= 80.0);
        assert!((result.speed - 6.0).abs() < 0.1);
    }

    #[test]
    fn test_pushup_counts_depth_axis() {
        let n = 500;
        let z: Vec<f64> = cycles(&[50; 10], 4.0).iter().map(|v| v + G).collect();
        let signal = RawSignal::from_channels(
            FS,
            vec![
                (ChannelId::AccX, vec![0.0; n]),
                (ChannelId::AccY, vec![-G; n]),
                (ChannelId::AccZ, z),
            ],
        )
        .unwrap();
        let result = MovementAnalyzer::default().analyze(&signal, ExerciseId::Pushup);
        assert!((9..=11).contains(&result.repetitions));
    }

    #[test]
    fn test_flat_dynamic_window_has_neutral_regularity() {
        let result = MovementAnalyzer::default().analyze(&window(vec![-G; 300]), ExerciseId::Curl);
        assert_eq!(result.repetitions, 0);
        assert_eq!(result.regularity, 50.0);
        assert_eq!(result.amplitude, 0.0);
        assert_eq!(result.score, 30.0);
    }

    #[test]
    fn test_empty_window() {
        let signal = RawSignal::from_channels(FS, vec![(ChannelId::AccY, Vec::new())]).unwrap();
        let result = MovementAnalyzer::default().analyze(&signal, ExerciseId::Squat);
        assert_eq!(result, AnalysisResult::empty(ExerciseId::Squat));
    }

    #[test]
    fn test_single_sample_window() {
        let result = MovementAnalyzer::default().analyze(&window(vec![-G]), ExerciseId::Deadlift);
        assert_eq!(result.duration, 0.0);
        assert_eq!(result.speed, 0.0);
        assert_eq!(result.repetitions, 0);
    }

    #[test]
    fn test_non_finite_samples_are_sanitized() {
        let mut y = cycles(&[50; 6], 5.0);
        y[0] = f64::NAN;
        y[100] = f64::INFINITY;
        y[101] = f64::NAN;
        let result = MovementAnalyzer::default().analyze(&window(y), ExerciseId::Squat);
        for v in [result.duration, result.regularity, result.score, result.speed, result.amplitude] {
            assert!(v.is_finite());
        }
        assert!((5..=7).contains(&result.repetitions));
    }

    #[test]
    fn test_sanitize_forward_fills() {
        assert_eq!(
            sanitize(&[f64::NAN, 1.0, f64::INFINITY, 2.0]),
            vec![0.0, 1.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_analyze_named_resolves_aliases() {
        let analyzer = MovementAnalyzer::default();
        let signal = window(cycles(&[50; 4], 5.0));
        let result = analyzer.analyze_named(&signal, "Bicep Curl").unwrap();
        assert_eq!(result.exercise, ExerciseId::Curl);
        assert!(analyzer.analyze_named(&signal, "burpee").is_err());
    }
}
