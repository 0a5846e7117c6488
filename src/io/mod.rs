//! File formats.
//!
//! - station weight files (`weights`)
//! - saved grids and misfit arrays, JSON or NPZ (`container`)

pub mod container;
pub mod weights;

pub use container::{Container, load_container, save_container, save_grid};
pub use weights::{StationWeights, WeightSlot, WeightTable, parse_weight_file, remove_unused_stations};
