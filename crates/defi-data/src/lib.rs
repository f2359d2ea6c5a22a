//! Data layer for the DeFi analyzer.
//!
//! Responsible for loading and cleaning the protocol CSV, classifying
//! free-text function descriptions, aggregating categories, scoring
//! composability opportunities, computing summary statistics and exporting
//! the derived tables.

pub mod aggregator;
pub mod analysis;
pub mod classifier;
pub mod export;
pub mod reader;
pub mod stats;

pub use defi_core as core;
