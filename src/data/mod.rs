//! Input data sources.
//!
//! Only synthetic data for now: seeded Green's tensors and the observed
//! waveforms they produce for a chosen tensor.

pub mod synthetic;

pub use synthetic::{WaveLayout, observe, station_id, synthetic_greens};
