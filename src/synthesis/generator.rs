//! Per-exercise waveform synthesis.
//!
//! A window is split into equal repetition slices and each slice is filled
//! by one motion cycle. The drawn tempo and the fatigue jitter warp the
//! phase inside the slice without changing the cycle count, so every slice
//! keeps exactly one extremum per axis. Isometric holds are a single slow
//! sway over the whole window. Gravity, sensor noise and a zero-phase
//! low-pass are applied to the concatenated channels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use super::SynthesisError;
use crate::config::SynthesisConfig;
use crate::processing::ButterworthLowpass;
use crate::types::{Axis, ChannelId, ExerciseArchetype, ExerciseId, RawSignal, UserProfile};

/// Peak of `sin θ + ¼ sin 2θ`, used to normalize the depth waveform.
const DEPTH_SHAPE_PEAK: f64 = 1.100_917_368_760_403;

/// Bound on the in-slice phase warp; below 1 the phase stays monotonic.
const MAX_PHASE_WARP: f64 = 0.6;

/// Gyroscope phase lag behind the accelerometer (rad).
const GYRO_PHASE_LAG: f64 = PI / 4.0;

/// Gyroscope per-axis ratios (x, y, z).
const GYRO_AXIS_RATIO: [f64; 3] = [1.0, 0.5, 0.3];

const AXES: [Axis; 3] = [Axis::Lateral, Axis::Vertical, Axis::Depth];

/// Quality and shape parameters for one synthesized window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// Window length (s)
    pub duration_s: f64,
    /// Repetition count, derived from the archetype tempo when `None`
    pub reps: Option<u32>,
    /// Progressive fatigue over the set, 0 = none
    pub fatigue: f64,
    /// Technique quality, 1 = perfect
    pub form_quality: f64,
    /// Emit gyroscope channels alongside the accelerometer
    pub include_gyro: bool,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            reps: None,
            fatigue: 0.0,
            form_quality: 1.0,
            include_gyro: true,
        }
    }
}

impl SynthesisParams {
    pub fn new(duration_s: f64) -> Self {
        Self {
            duration_s,
            ..Self::default()
        }
    }

    pub fn with_reps(mut self, reps: u32) -> Self {
        self.reps = Some(reps);
        self
    }

    pub fn with_fatigue(mut self, fatigue: f64) -> Self {
        self.fatigue = fatigue;
        self
    }

    pub fn with_form_quality(mut self, form_quality: f64) -> Self {
        self.form_quality = form_quality;
        self
    }

    pub fn accelerometer_only(mut self) -> Self {
        self.include_gyro = false;
        self
    }

    pub fn validate(&self) -> Result<(), SynthesisError> {
        if !self.duration_s.is_finite() || self.duration_s <= 0.0 {
            return Err(invalid("duration_s", format!("must be > 0, got {}", self.duration_s)));
        }
        if self.reps == Some(0) {
            return Err(invalid("reps", "must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.fatigue) {
            return Err(invalid("fatigue", format!("must be in [0, 1], got {}", self.fatigue)));
        }
        if !(0.0..=1.0).contains(&self.form_quality) {
            return Err(invalid(
                "form_quality",
                format!("must be in [0, 1], got {}", self.form_quality),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> SynthesisError {
    SynthesisError::InvalidParameter { name, reason }
}

/// Produces synthetic IMU windows.
///
/// Owns its random source: `new` seeds from the OS, `with_seed` gives
/// reproducible output.
pub struct SignalSynthesizer {
    config: SynthesisConfig,
    rng: StdRng,
}

impl SignalSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(config: SynthesisConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn sampling_rate(&self) -> f64 {
        self.config.sampling_rate
    }

    /// Synthesize a window for a free-form exercise id (aliases accepted).
    pub fn synthesize(
        &mut self,
        exercise_id: &str,
        profile: &UserProfile,
        params: &SynthesisParams,
    ) -> Result<RawSignal, SynthesisError> {
        let exercise = ExerciseId::resolve(exercise_id)?;
        self.synthesize_exercise(exercise, profile, params)
    }

    pub fn synthesize_exercise(
        &mut self,
        exercise: ExerciseId,
        profile: &UserProfile,
        params: &SynthesisParams,
    ) -> Result<RawSignal, SynthesisError> {
        params.validate()?;
        let archetype = exercise.archetype();
        let fs = self.config.sampling_rate;

        let n = (params.duration_s * fs).round() as usize;
        if n == 0 {
            return Err(invalid(
                "duration_s",
                format!("{} s holds no samples at {fs} Hz", params.duration_s),
            ));
        }

        let mut acc: [Vec<f64>; 3] = std::array::from_fn(|_| vec![0.0; n]);
        let mut gyr: Option<[Vec<f64>; 3]> =
            params.include_gyro.then(|| std::array::from_fn(|_| vec![0.0; n]));

        let reps = if archetype.isometric {
            self.hold(archetype, profile, n, &mut acc, gyr.as_mut());
            1
        } else {
            let reps = params.reps.unwrap_or_else(|| {
                let derived = (params.duration_s / archetype.mean_rep_duration()).floor();
                (derived as u32).max(1)
            });
            self.repetitions(archetype, profile, params, reps, n, &mut acc, gyr.as_mut());
            reps
        };

        acc[1].iter_mut().for_each(|v| *v -= self.config.gravity);

        let noise_std = if archetype.isometric {
            self.config.isometric_noise_std
        } else {
            self.config.noise_std
        };
        for channel in &mut acc {
            self.add_noise(channel, noise_std);
        }
        if let Some(gyr) = gyr.as_mut() {
            for channel in gyr.iter_mut() {
                self.add_noise(channel, noise_std * self.config.gyro_noise_ratio);
            }
        }

        if self.config.lowpass_cutoff_hz < fs / 2.0 {
            let filter = ButterworthLowpass::new(self.config.lowpass_cutoff_hz, fs)?;
            for channel in acc.iter_mut().chain(gyr.iter_mut().flatten()) {
                *channel = filter.filtfilt(channel);
            }
        } else {
            debug!(
                cutoff_hz = self.config.lowpass_cutoff_hz,
                sampling_rate = fs,
                "Low-pass cutoff at or above Nyquist, skipping filter"
            );
        }

        let [acc_x, acc_y, acc_z] = acc;
        let mut channels = vec![
            (ChannelId::AccX, acc_x),
            (ChannelId::AccY, acc_y),
            (ChannelId::AccZ, acc_z),
        ];
        if let Some([gyr_x, gyr_y, gyr_z]) = gyr {
            channels.push((ChannelId::GyrX, gyr_x));
            channels.push((ChannelId::GyrY, gyr_y));
            channels.push((ChannelId::GyrZ, gyr_z));
        }

        debug!(
            exercise = %exercise,
            samples = n,
            reps,
            fatigue = params.fatigue,
            form_quality = params.form_quality,
            "Synthesized window"
        );

        Ok(RawSignal::from_channels(fs, channels)?)
    }

    #[allow(clippy::too_many_arguments)]
    fn repetitions(
        &mut self,
        archetype: &ExerciseArchetype,
        profile: &UserProfile,
        params: &SynthesisParams,
        reps: u32,
        n: usize,
        acc: &mut [Vec<f64>; 3],
        mut gyr: Option<&mut [Vec<f64>; 3]>,
    ) {
        let strength = profile.strength_factor();
        let speed = profile.speed_factor();
        let reps_f = f64::from(reps);
        let dominant = axis_index(archetype.dominant_axis);
        let (f_lo, f_hi) = archetype.frequency_hz;
        let nominal_freq = (f_lo + f_hi) / 2.0 * speed;

        for k in 0..reps {
            let start = (f64::from(k) * n as f64 / reps_f).round() as usize;
            let end = ((f64::from(k) + 1.0) * n as f64 / reps_f).round() as usize;
            let slice_len = end.saturating_sub(start);
            if slice_len < 2 {
                continue;
            }

            let level = params.fatigue * f64::from(k) / (reps_f - 1.0).max(1.0);
            let form = params.form_quality * (1.0 - self.config.fatigue_form_loss * level);

            // Tempo away from the archetype midpoint skews the cycle
            let freq = uniform(&mut self.rng, archetype.frequency_hz) * speed;
            let jitter = if level > 0.0 {
                1.0 + level * self.rng.gen_range(-0.5..0.5)
            } else {
                1.0
            };
            let warp = (freq / nominal_freq * jitter - 1.0).clamp(-MAX_PHASE_WARP, MAX_PHASE_WARP);

            let decay = 1.0 - self.config.fatigue_amplitude_loss * level;
            let amps: [f64; 3] = std::array::from_fn(|a| {
                uniform(&mut self.rng, archetype.amplitude_range(AXES[a]))
                    * strength
                    * archetype.axis_gain[a]
                    * decay
            });

            for i in 0..slice_len {
                let u = 2.0 * PI * i as f64 / slice_len as f64;
                let theta = u + warp * u.sin();
                for a in 0..3 {
                    acc[a][start + i] += amps[a] * axis_shape(archetype, AXES[a], theta);
                }
                if let Some(gyr) = gyr.as_deref_mut() {
                    for a in 0..3 {
                        gyr[a][start + i] += archetype.gyro_gain
                            * GYRO_AXIS_RATIO[a]
                            * decay
                            * axis_shape(archetype, AXES[a], theta - GYRO_PHASE_LAG);
                    }
                }
            }

            if form < self.config.form_threshold {
                let scale = amps[dominant].abs() * 0.2 * (1.0 - form);
                for v in &mut acc[dominant][start..end] {
                    let z: f64 = self.rng.sample(StandardNormal);
                    *v += scale * z;
                }
            }
        }
    }

    fn hold(
        &mut self,
        archetype: &ExerciseArchetype,
        profile: &UserProfile,
        n: usize,
        acc: &mut [Vec<f64>; 3],
        gyr: Option<&mut [Vec<f64>; 3]>,
    ) {
        let fs = self.config.sampling_rate;
        let freq = uniform(&mut self.rng, archetype.frequency_hz) * profile.speed_factor();
        let strength = profile.strength_factor();
        let amps: [f64; 3] = std::array::from_fn(|a| {
            uniform(&mut self.rng, archetype.amplitude_range(AXES[a])) * strength * archetype.axis_gain[a]
        });

        let phase = |i: usize| 2.0 * PI * freq * i as f64 / fs;
        for (a, channel) in acc.iter_mut().enumerate() {
            for (i, v) in channel.iter_mut().enumerate() {
                *v += amps[a] * axis_shape(archetype, AXES[a], phase(i));
            }
        }
        if let Some(gyr) = gyr {
            for (a, channel) in gyr.iter_mut().enumerate() {
                for (i, v) in channel.iter_mut().enumerate() {
                    *v += archetype.gyro_gain
                        * GYRO_AXIS_RATIO[a]
                        * axis_shape(archetype, AXES[a], phase(i) - GYRO_PHASE_LAG);
                }
            }
        }
    }

    fn add_noise(&mut self, channel: &mut [f64], std: f64) {
        let q = self.config.quantization_noise;
        for v in channel.iter_mut() {
            let gaussian: f64 = self.rng.sample(StandardNormal);
            let quantization = if q > 0.0 { self.rng.gen_range(-q..q) } else { 0.0 };
            *v += std * gaussian + quantization;
        }
    }
}

fn uniform(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

const fn axis_index(axis: Axis) -> usize {
    match axis {
        Axis::Lateral => 0,
        Axis::Vertical => 1,
        Axis::Depth => 2,
    }
}

/// Unit waveform of one axis over a cycle phase `theta`.
fn axis_shape(archetype: &ExerciseArchetype, axis: Axis, theta: f64) -> f64 {
    match axis {
        Axis::Vertical => theta.sin(),
        Axis::Depth => (theta.sin() + 0.25 * (2.0 * theta).sin()) / DEPTH_SHAPE_PEAK,
        Axis::Lateral if archetype.lateral_in_phase => theta.sin(),
        Axis::Lateral => (theta / 2.0).sin(),
    }
}
