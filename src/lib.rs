//! `mt-search` library crate.
//!
//! Grid search over seismic moment tensors: build a parameter grid, map every
//! point to a moment tensor, score it against observed waveforms in one or
//! more data categories, and keep the misfit per point.
//!
//! The binary (`mtsearch`) is a thin wrapper around this library so that the
//! search is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod grid;
pub mod io;
pub mod misfit;
pub mod report;
pub mod results;
pub mod search;
pub mod tensor;
pub mod waveform;
