//! Data ingestion layer for the viability report.
//!
//! Recovers JSON from damaged export files, loads the client registry,
//! normalises transaction records into typed rows and builds the monthly
//! report tables.

pub mod aggregator;
pub mod clients;
pub mod decode;
pub mod extractor;
pub mod reader;
pub mod reports;

pub use viability_core as core;
