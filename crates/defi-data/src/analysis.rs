//! Main analysis pipeline.
//!
//! Runs classification, aggregation, opportunity scoring and statistics over
//! a loaded [`Dataset`], returning an [`AnalysisResult`] ready for export and
//! reporting.

use chrono::Utc;
use defi_core::config::{ClassifierConfig, ScoringConfig};
use defi_core::error::Result;
use defi_core::models::{
    CategoryAggregate, FunctionRecord, FunctionSummary, ProtocolRecord, SynergyOpportunity,
};
use tracing::info;

use crate::aggregator::CategoryAggregator;
use crate::classifier::{summarize_functions, FunctionClassifier};
use crate::reader::Dataset;
use crate::stats::{generate_stats, StatsReport};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Number of protocol rows analysed.
    pub protocols_processed: usize,
    /// TVL cells that were coerced to zero while loading.
    pub coerced_tvl_cells: usize,
    /// Number of `(category, subcategory)` groups.
    pub groups_created: usize,
    /// Wall-clock seconds spent classifying function text.
    pub classify_time_seconds: f64,
    /// Wall-clock seconds spent aggregating and scoring.
    pub scoring_time_seconds: f64,
}

/// The complete output of [`analyze_dataset`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Deduplicated standardized function records.
    pub functions: Vec<FunctionRecord>,
    /// Per-label totals, largest TVL first.
    pub function_summary: Vec<FunctionSummary>,
    /// Category groups, largest TVL first.
    pub aggregates: Vec<CategoryAggregate>,
    /// Pairs above the synergy threshold, highest score first.
    pub opportunities: Vec<SynergyOpportunity>,
    /// Largest protocols by TVL.
    pub top_protocols: Vec<ProtocolRecord>,
    pub stats: StatsReport,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis over `dataset`.
///
/// 1. Classify function text into [`FunctionRecord`]s (rules adjusted by
///    `classifier`) and summarise them.
/// 2. Aggregate protocols by category and subcategory.
/// 3. Scan group pairs for synergy opportunities.
/// 4. Pick the `top_n` largest protocols.
/// 5. Compute summary statistics (fails on missing columns).
pub fn analyze_dataset(
    dataset: &Dataset,
    classifier: &ClassifierConfig,
    scoring: &ScoringConfig,
    top_n: usize,
) -> Result<AnalysisResult> {
    // ── Step 1: Functions ─────────────────────────────────────────────────────
    let classify_start = std::time::Instant::now();
    let functions = FunctionClassifier::from_config(classifier).standardize(&dataset.records);
    let function_summary = summarize_functions(&functions);
    let classify_time = classify_start.elapsed().as_secs_f64();

    // ── Step 2-3: Groups and opportunities ────────────────────────────────────
    let scoring_start = std::time::Instant::now();
    let aggregates = CategoryAggregator::aggregate(&dataset.records);
    let opportunities = CategoryAggregator::find_opportunities(&aggregates, scoring);
    let scoring_time = scoring_start.elapsed().as_secs_f64();

    // ── Step 4: Top protocols ─────────────────────────────────────────────────
    let top_protocols = CategoryAggregator::top_protocols(&dataset.records, top_n);

    // ── Step 5: Stats ─────────────────────────────────────────────────────────
    let stats = generate_stats(dataset)?;

    info!(
        "Analysis: {} function records, {} groups, {} opportunities",
        functions.len(),
        aggregates.len(),
        opportunities.len()
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        protocols_processed: dataset.len(),
        coerced_tvl_cells: dataset.coerced_tvl_cells,
        groups_created: aggregates.len(),
        classify_time_seconds: classify_time,
        scoring_time_seconds: scoring_time,
    };

    Ok(AnalysisResult {
        functions,
        function_summary,
        aggregates,
        opportunities,
        top_protocols,
        stats,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
