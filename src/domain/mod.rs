//! Run configuration types shared by the CLI and the pipeline.
//!
//! - grid presets (`GridPreset`)
//! - the synthetic self-test configuration (`SyntheticConfig`)

pub mod types;

pub use types::*;
