//! Synthetic IMU signal generation
//!
//! - `SignalSynthesizer`: one exercise window for a profile and quality parameters
//! - `generate_dataset`: labelled windows across reference profiles, in parallel

mod dataset;
mod generator;

pub use dataset::*;
pub use generator::*;

use thiserror::Error;

use crate::processing::ProcessingError;
use crate::types::{SignalError, UnsupportedExerciseError};

/// Errors raised while synthesizing windows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error(transparent)]
    UnsupportedExercise(#[from] UnsupportedExerciseError),

    #[error("Invalid synthesis parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Signal assembly failed: {0}")]
    Signal(#[from] SignalError),

    #[error("Filter design failed: {0}")]
    Processing(#[from] ProcessingError),
}
