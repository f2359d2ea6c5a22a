//! Markdown analysis report.
//!
//! Assembles `analysis.md` from the analysis result and the rendered charts.
//! Each section is built by its own function and appended in order.

use std::path::Path;

use chrono::DateTime;
use defi_core::config::OutputPaths;
use defi_core::error::{AnalyzerError, Result};
use defi_core::formatting::{format_compact_currency, format_currency, format_number};
use defi_core::models::{FunctionSummary, ProtocolRecord, SynergyOpportunity};
use defi_data::analysis::{AnalysisMetadata, AnalysisResult};
use defi_data::stats::StatsReport;
use tracing::info;

use crate::charts::RenderedChart;

/// Everything the report needs for one run.
pub struct ReportContext<'a> {
    /// Source CSV path, shown in the metadata block.
    pub source: &'a Path,
    pub analysis: &'a AnalysisResult,
    pub charts: &'a [RenderedChart],
    /// Used to turn chart paths into links relative to the report.
    pub output: &'a OutputPaths,
    /// Maximum rows in the opportunities table.
    pub top_n: usize,
}

/// Generate the complete Markdown report.
pub fn generate_markdown_report(ctx: &ReportContext<'_>) -> String {
    let mut output = String::new();

    output.push_str("# DeFi Opportunities Analysis\n\n");
    output.push_str(&generate_metadata_section(ctx.source, &ctx.analysis.metadata));
    output.push_str(&generate_charts_section(ctx.charts, ctx.output));
    output.push_str(&generate_statistics_section(&ctx.analysis.stats));
    output.push_str(&generate_top_protocols_section(&ctx.analysis.top_protocols));
    output.push_str(&generate_function_section(&ctx.analysis.function_summary));
    output.push_str(&generate_opportunities_section(
        &ctx.analysis.opportunities,
        ctx.top_n,
    ));

    output
}

/// Write the report to `path`.
pub fn write_report(ctx: &ReportContext<'_>, path: &Path) -> Result<()> {
    std::fs::write(path, generate_markdown_report(ctx))
        .map_err(|e| AnalyzerError::file(path, e))?;
    info!("Analysis complete! Check {} for the report.", path.display());
    Ok(())
}

fn generate_metadata_section(source: &Path, metadata: &AnalysisMetadata) -> String {
    let mut section = String::new();

    let generated = DateTime::parse_from_rfc3339(&metadata.generated_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|_| metadata.generated_at.clone());

    section.push_str(&format!("- **Source:** `{}`\n", source.display()));
    section.push_str(&format!("- **Generated:** {}\n", generated));
    section.push_str(&format!(
        "- **Protocols Processed:** {}\n",
        metadata.protocols_processed
    ));
    if metadata.coerced_tvl_cells > 0 {
        section.push_str(&format!(
            "- **Unparseable TVL Values (treated as 0):** {}\n",
            metadata.coerced_tvl_cells
        ));
    }
    section.push_str(&format!(
        "- **Category Groups:** {}\n",
        metadata.groups_created
    ));
    section.push('\n');

    section
}

fn generate_charts_section(charts: &[RenderedChart], output: &OutputPaths) -> String {
    let mut section = String::new();

    section.push_str("## Charts\n\n");
    if charts.is_empty() {
        section.push_str("_Chart rendering was disabled for this run._\n\n");
        return section;
    }

    for chart in charts {
        let link = output
            .relative(&chart.path)
            .to_string_lossy()
            .replace('\\', "/");
        section.push_str(&format!("### {}\n", chart.title));
        section.push_str(&format!("![{}]({})\n\n", chart.title, link));
    }

    section
}

fn generate_statistics_section(stats: &StatsReport) -> String {
    let mut section = String::new();

    section.push_str("## Statistics\n\n");
    for (label, value) in stats.entries() {
        section.push_str(&format!(
            "- **{}:** {}\n",
            label,
            format_number(value.as_f64(), 2)
        ));
    }
    section.push('\n');

    section
}

fn generate_top_protocols_section(protocols: &[ProtocolRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Top Protocols\n\n");
    if protocols.is_empty() {
        section.push_str("No protocols found.\n\n");
        return section;
    }

    section.push_str("| # | Protocol | Category | Subcategory | TVL |\n");
    section.push_str("|---|----------|----------|-------------|-----|\n");
    for (rank, p) in protocols.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            rank + 1,
            escape_cell(&p.protocol),
            escape_cell(&p.category),
            escape_cell(&p.subcategory),
            format_currency(p.tvl)
        ));
    }
    section.push('\n');

    section
}

fn generate_function_section(summary: &[FunctionSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Function Summary\n\n");
    if summary.is_empty() {
        section.push_str("No protocol functions were described in the source data.\n\n");
        return section;
    }

    section.push_str("| Function | Protocols | Total TVL |\n");
    section.push_str("|----------|-----------|-----------|\n");
    for row in summary {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            row.function,
            row.protocol_count,
            format_compact_currency(row.total_tvl)
        ));
    }
    section.push('\n');

    section
}

fn generate_opportunities_section(opportunities: &[SynergyOpportunity], top_n: usize) -> String {
    let mut section = String::new();

    section.push_str("## Composability Opportunities\n\n");
    if opportunities.is_empty() {
        section.push_str("No category pairs scored above the synergy threshold.\n\n");
        return section;
    }

    let shown = opportunities.len().min(top_n);
    section.push_str(&format!(
        "Showing {} of {} pairs above the synergy threshold.\n\n",
        shown,
        opportunities.len()
    ));
    section.push_str("| Group A | Group B | Synergy Score |\n");
    section.push_str("|---------|---------|---------------|\n");
    for opp in opportunities.iter().take(top_n) {
        section.push_str(&format!(
            "| {} / {} | {} / {} | {:.4} |\n",
            escape_cell(&opp.category_a),
            escape_cell(&opp.subcategory_a),
            escape_cell(&opp.category_b),
            escape_cell(&opp.subcategory_b),
            opp.synergy_score
        ));
    }
    section.push('\n');

    section
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
