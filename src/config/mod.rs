//! Coach Configuration Module
//!
//! Every tunable constant of the synthesizer, analyzer, classifier fallback
//! and trainer, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `SMARTCOACH_CONFIG` environment variable (path to TOML file)
//! 2. `smartcoach.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Components take their section by value, so there is no global instance:
//!
//! ```ignore
//! let config = CoachConfig::load();
//! let analyzer = MovementAnalyzer::new(config.analyzer.clone());
//! ```

mod coach_config;
pub mod defaults;
pub mod validation;

pub use coach_config::*;
