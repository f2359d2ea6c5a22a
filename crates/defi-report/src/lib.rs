//! Presentation layer for the DeFi analyzer.
//!
//! Renders PNG charts with [`plotters`] and assembles the Markdown analysis
//! report that links them.

pub mod charts;
pub mod markdown;

pub use defi_core as core;
