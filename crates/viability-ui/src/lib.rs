//! Terminal UI layer for the viability report.
//!
//! Provides themes, plain-text table rendering for stdout, ratatui table and
//! chart widgets, and the interactive application loop with year selection.

pub mod app;
pub mod report_view;
pub mod text_view;
pub mod themes;

pub use viability_core as core;
