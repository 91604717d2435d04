//! Runtime layer for the viability report.
//!
//! Owns the cached [`Dataset`](viability_data::reader::Dataset) so that the
//! interactive view can re-render and reload without re-reading unchanged
//! exports.

pub mod data_manager;

pub use viability_core as core;
pub use viability_data as data;
