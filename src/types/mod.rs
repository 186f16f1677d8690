//! Shared data structures for the motion pipeline
//!
//! - `ExerciseId` / `ExerciseArchetype`: the closed exercise catalog
//! - `UserProfile`: who is moving the sensor
//! - `RawSignal`: a validated multi-channel IMU window
//! - `ClassificationResult` / `AnalysisResult`: pipeline outputs

mod exercise;
mod profile;
mod results;
mod signal;

pub use exercise::*;
pub use profile::*;
pub use results::*;
pub use signal::*;
