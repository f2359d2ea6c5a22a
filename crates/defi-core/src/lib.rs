//! Shared domain types for the DeFi analyzer.
//!
//! Holds the protocol/function/category models, the error type, run
//! configuration and CLI settings, plus small formatting and statistics
//! helpers used by the data and report layers.

pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod statistics;

pub use error::{AnalyzerError, Result};
