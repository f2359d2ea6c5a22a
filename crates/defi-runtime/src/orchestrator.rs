//! Batch analysis orchestrator.
//!
//! Drives one run end to end: load and clean the source CSV, analyse it,
//! export every derived table, render charts and write the Markdown report.
//! Every stage receives its slice of the [`RunConfig`]; the first failure
//! aborts the run.

use std::path::PathBuf;
use std::time::Instant;

use defi_core::config::RunConfig;
use defi_core::error::Result;
use defi_data::analysis::{analyze_dataset, AnalysisResult};
use defi_data::export::write_csv;
use defi_data::reader::{load_dataset, Dataset};
use defi_data::stats::{write_stats_json, write_stats_markdown};
use defi_report::charts::{ChartRenderer, RenderedChart};
use defi_report::markdown::{write_report, ReportContext};

// ── Public types ──────────────────────────────────────────────────────────────

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Path of `analysis.md`.
    pub report_path: PathBuf,
    /// Every file written, in write order (charts and report included).
    pub artifacts: Vec<PathBuf>,
    pub charts: Vec<RenderedChart>,
    pub protocols: usize,
    pub opportunities: usize,
    pub elapsed_seconds: f64,
}

// ── AnalysisOrchestrator ──────────────────────────────────────────────────────

/// Runs the full pipeline for one [`RunConfig`].
pub struct AnalysisOrchestrator {
    config: RunConfig,
}

impl AnalysisOrchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Execute the pipeline.
    ///
    /// Output directories are created first; nothing is cleaned up if a later
    /// stage fails.
    pub fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        self.config.validate()?;

        let paths = &self.config.output;
        paths.ensure_dirs()?;

        tracing::info!("Reading {}", self.config.input.display());
        let dataset = load_dataset(&self.config.input, &self.config.columns)?;
        tracing::info!("Available columns: {:?}", dataset.table.columns);
        if dataset.is_empty() {
            tracing::warn!("{} has no protocol rows", self.config.input.display());
        }

        let analysis = analyze_dataset(
            &dataset,
            &self.config.classifier,
            &self.config.scoring,
            self.config.charts.top_n,
        )?;

        let mut artifacts = self.write_tables(&dataset, &analysis)?;

        let charts = self.render_charts(&dataset, &analysis)?;
        artifacts.extend(charts.iter().map(|c| c.path.clone()));

        tracing::info!("Generating markdown report...");
        let report_path = paths.report();
        write_report(
            &ReportContext {
                source: &self.config.input,
                analysis: &analysis,
                charts: &charts,
                output: paths,
                top_n: self.config.charts.top_n,
            },
            &report_path,
        )?;
        artifacts.push(report_path.clone());

        let elapsed = start.elapsed().as_secs_f64();
        tracing::debug!(
            artifacts = artifacts.len(),
            elapsed_seconds = elapsed,
            "run finished"
        );

        Ok(RunSummary {
            report_path,
            artifacts,
            charts,
            protocols: dataset.len(),
            opportunities: analysis.opportunities.len(),
            elapsed_seconds: elapsed,
        })
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Write the cleaned table, derived CSVs and statistics documents.
    fn write_tables(&self, dataset: &Dataset, analysis: &AnalysisResult) -> Result<Vec<PathBuf>> {
        let paths = &self.config.output;

        let cleaned = paths.cleaned_csv();
        dataset.write_cleaned_csv(&cleaned)?;

        let functions = paths.function_analysis_csv();
        write_csv(&functions, &analysis.functions)?;

        let summary = paths.function_summary_csv();
        write_csv(&summary, &analysis.function_summary)?;

        let aggregates = paths.category_aggregates_csv();
        write_csv(&aggregates, &analysis.aggregates)?;

        let opportunities = paths.opportunities_csv();
        write_csv(&opportunities, &analysis.opportunities)?;

        let stats_json = paths.stats_json();
        write_stats_json(&analysis.stats, &stats_json)?;

        let stats_md = paths.stats_markdown();
        write_stats_markdown(&analysis.stats, &stats_md)?;

        Ok(vec![
            cleaned,
            functions,
            summary,
            aggregates,
            opportunities,
            stats_json,
            stats_md,
        ])
    }

    fn render_charts(
        &self,
        dataset: &Dataset,
        analysis: &AnalysisResult,
    ) -> Result<Vec<RenderedChart>> {
        if !self.config.charts.enabled {
            tracing::info!("Chart rendering disabled; skipping charts");
            return Ok(Vec::new());
        }

        let charts_dir = self.config.output.charts_dir();
        ChartRenderer::new(&self.config.charts, &charts_dir)
            .render_all(&dataset.records, &analysis.aggregates)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
