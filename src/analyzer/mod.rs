//! Movement quality analysis
//!
//! Counts repetitions and scores regularity and range of motion from the raw
//! accelerometer window of a declared exercise. Independent of the
//! classifier: the caller says what was performed.
//!
//! Scoring formulas are calibrated on synthetic sets only.

mod movement;

pub use movement::*;
