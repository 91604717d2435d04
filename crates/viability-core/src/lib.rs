//! Shared domain model for the viability report.
//!
//! Holds the typed transaction and client records, the error type, the
//! field-extraction helpers used to tame loosely-typed JSON exports, number
//! formatting and the command-line settings.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
