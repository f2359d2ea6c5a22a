//! Runtime layer for the DeFi analyzer.
//!
//! Sequences loading, analysis, export, chart rendering and report writing
//! for a single batch run.

pub mod orchestrator;

pub use defi_core as core;
pub use defi_data as data;
