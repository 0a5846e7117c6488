//! Error types.
//!
//! - `SearchError`: typed failures of the search core (grids, transforms,
//!   misfit evaluation, persistence).
//! - `AppError`: what the binary reports, carrying a process exit code.
//!
//! Exit codes used by `AppError`:
//! - 2: configuration / input problems (bad bounds, bad partitions, unreadable files)
//! - 3: data problems (shape mismatches, weight files)
//! - 4: numeric / search failures (synthesis failures, empty results)

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the grid-search core.
#[derive(Debug, Error)]
pub enum SearchError {
    /// An axis bound or sample lies outside the parameterization's domain.
    #[error("invalid parameter domain for axis '{axis}': {reason}")]
    InvalidParameterDomain { axis: String, reason: String },

    #[error("cannot partition a grid of {size} points into {parts} parts")]
    InvalidPartition { parts: usize, size: usize },

    #[error("grid index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    /// Only produced by explicit lookups; misfit evaluation skips such stations.
    #[error("station '{station}' has no weight entry")]
    MissingWeightEntry { station: String },

    #[error("synthesis failed for station '{station}': {reason}")]
    SynthesisFailure { station: String, reason: String },

    #[error("{feature} is not implemented")]
    UnimplementedFeature { feature: String },

    #[error("grid has no parameter transform; moment tensors cannot be produced")]
    MissingTransform,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("weight file line {line}: {reason}")]
    WeightFileParse { line: usize, reason: String },

    #[error("shape mismatch for '{what}': expected {expected}, got {got}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("container error: {0}")]
    Container(String),

    /// A search worker went away without reporting its partition.
    #[error("search worker {rank} failed: {reason}")]
    WorkerFailed { rank: usize, reason: String },
}

impl SearchError {
    pub fn domain(axis: impl Into<String>, reason: impl Into<String>) -> Self {
        SearchError::InvalidParameterDomain {
            axis: axis.into(),
            reason: reason.into(),
        }
    }

    pub fn synthesis(station: impl Into<String>, reason: impl Into<String>) -> Self {
        SearchError::SynthesisFailure {
            station: station.into(),
            reason: reason.into(),
        }
    }

    pub fn unimplemented(feature: impl Into<String>) -> Self {
        SearchError::UnimplementedFeature {
            feature: feature.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SearchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            SearchError::InvalidParameterDomain { .. }
            | SearchError::InvalidPartition { .. }
            | SearchError::IndexOutOfRange { .. }
            | SearchError::UnimplementedFeature { .. }
            | SearchError::MissingTransform
            | SearchError::InvalidConfig(_)
            | SearchError::Io { .. } => 2,
            SearchError::MissingWeightEntry { .. }
            | SearchError::WeightFileParse { .. }
            | SearchError::ShapeMismatch { .. }
            | SearchError::Container(_) => 3,
            SearchError::SynthesisFailure { .. } | SearchError::WorkerFailed { .. } => 4,
        }
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
