//! Terminal reports for search runs and saved containers.

pub mod format;

pub use format::{format_container_summary, format_search_summary};
