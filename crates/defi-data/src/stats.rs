//! Summary statistics over the cleaned protocol table.

use std::collections::HashSet;
use std::path::Path;

use defi_core::error::{AnalyzerError, Result};
use defi_core::formatting::format_number;
use defi_core::statistics::{mean, median};
use serde::Serialize;
use tracing::{error, info};

use crate::reader::{clean_tvl, value_counts, Dataset};

// ── StatsReport ───────────────────────────────────────────────────────────────

/// A single labeled statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Count(usize),
    Amount(f64),
}

impl StatValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            StatValue::Count(n) => *n as f64,
            StatValue::Amount(v) => *v,
        }
    }
}

/// Scalar summaries of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_protocols: usize,
    pub total_tvl: f64,
    pub average_tvl: f64,
    pub median_tvl: f64,
    pub categories: usize,
    pub subcategories: usize,
    /// Distinct function phrases (one per line of the function column).
    pub functions: usize,
}

impl StatsReport {
    /// The report as an ordered `label → value` mapping.
    pub fn entries(&self) -> Vec<(&'static str, StatValue)> {
        vec![
            ("Total Protocols", StatValue::Count(self.total_protocols)),
            ("Total TVL", StatValue::Amount(self.total_tvl)),
            ("Average TVL", StatValue::Amount(self.average_tvl)),
            ("Median TVL", StatValue::Amount(self.median_tvl)),
            ("Categories", StatValue::Count(self.categories)),
            ("Subcategories", StatValue::Count(self.subcategories)),
            ("Functions", StatValue::Count(self.functions)),
        ]
    }

    /// Look up a statistic by its label.
    pub fn get(&self, label: &str) -> Option<StatValue> {
        self.entries()
            .into_iter()
            .find(|(key, _)| *key == label)
            .map(|(_, value)| value)
    }
}

// ── Generation ────────────────────────────────────────────────────────────────

/// Compute the summary statistics for `dataset`.
///
/// Fails with [`AnalyzerError::MissingColumn`] when the table lacks one of
/// the columns the statistics read; the error (with every column's data
/// type) is logged before being returned.
pub fn generate_stats(dataset: &Dataset) -> Result<StatsReport> {
    compute_stats(dataset).map_err(|e| {
        error!("An error occurred during stats generation: {}", e);
        error!(
            "Error occurred with data types: {}",
            dataset.table.describe_columns()
        );
        e
    })
}

fn compute_stats(dataset: &Dataset) -> Result<StatsReport> {
    let table = &dataset.table;
    let schema = &dataset.schema;

    let tvl_idx = table.require_column(&schema.tvl)?;
    let category_idx = table.require_column(&schema.category)?;
    let subcategory_idx = table.require_column(&schema.subcategory)?;
    let function_idx = table.require_column(&schema.function)?;

    let tvl: Vec<f64> = table.column_cells(tvl_idx).map(clean_tvl).collect();

    let mut functions: HashSet<&str> = HashSet::new();
    for cell in table.column_cells(function_idx) {
        functions.extend(cell.split('\n').map(str::trim).filter(|f| !f.is_empty()));
    }

    Ok(StatsReport {
        total_protocols: table.rows.len(),
        total_tvl: tvl.iter().sum(),
        average_tvl: mean(&tvl),
        median_tvl: median(&tvl),
        categories: value_counts(table, category_idx).len(),
        subcategories: value_counts(table, subcategory_idx).len(),
        functions: functions.len(),
    })
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Render the standalone statistics document.
///
/// Counts use thousands separators; amounts also get two decimals.
pub fn render_stats_markdown(report: &StatsReport) -> String {
    let mut out = String::from("# DeFi Protocol Statistics\n\n");
    for (label, value) in report.entries() {
        let formatted = match value {
            StatValue::Count(n) => format_number(n as f64, 0),
            StatValue::Amount(v) => format_number(v, 2),
        };
        out.push_str(&format!("- **{}:** {}\n", label, formatted));
    }
    out
}

/// Write [`render_stats_markdown`] to `path`.
pub fn write_stats_markdown(report: &StatsReport, path: &Path) -> Result<()> {
    std::fs::write(path, render_stats_markdown(report)).map_err(|e| AnalyzerError::file(path, e))?;
    info!("Saved statistics to {}", path.display());
    Ok(())
}

/// Write the report as pretty-printed JSON to `path`.
pub fn write_stats_json(report: &StatsReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| AnalyzerError::file(path, e))?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{load_dataset, RawTable};
    use defi_core::config::ColumnConfig;
    use tempfile::TempDir;

    fn dataset(rows: Vec<[&str; 5]>) -> Dataset {
        RawTable::new(
            "mem.csv",
            ["Protocol", "Category", "Subcategory", "TVL", "Function"],
            rows.into_iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .into_dataset(&ColumnConfig::default())
        .unwrap()
    }

    #[test]
    fn test_generate_stats_three_rows_end_to_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("three.csv");
        std::fs::write(
            &path,
            "Protocol,Category,Subcategory,TVL,Function\n\
             A,Dexes,AMM,\"$1,000.25\",Swap\n\
             B,Dexes,CLOB,$250.50,\"Swap\nPerps\"\n\
             C,Lending,Money Market,\"$10,000\",Borrow\n",
        )
        .unwrap();

        let dataset = load_dataset(&path, &ColumnConfig::default()).unwrap();
        let stats = generate_stats(&dataset).unwrap();

        assert_eq!(stats.get("Total Protocols"), Some(StatValue::Count(3)));
        assert_eq!(stats.total_tvl, 1_000.25 + 250.50 + 10_000.0);
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.subcategories, 3);
        assert_eq!(stats.functions, 3);
        assert!((stats.median_tvl - 1_000.25).abs() < 1e-9);
        assert!((stats.average_tvl - 11_250.75 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_generate_stats_coerced_tvl_counts_as_zero() {
        let ds = dataset(vec![
            ["A", "Dexes", "AMM", "$10", "Swap"],
            ["B", "Dexes", "AMM", "unknown", ""],
        ]);
        let stats = generate_stats(&ds).unwrap();
        assert_eq!(stats.total_protocols, 2);
        assert_eq!(stats.total_tvl, 10.0);
        assert_eq!(stats.median_tvl, 5.0);
        assert_eq!(stats.functions, 1);
    }

    #[test]
    fn test_generate_stats_empty_table() {
        let ds = dataset(vec![]);
        let stats = generate_stats(&ds).unwrap();
        assert_eq!(stats.total_protocols, 0);
        assert_eq!(stats.total_tvl, 0.0);
        assert_eq!(stats.average_tvl, 0.0);
        assert_eq!(stats.median_tvl, 0.0);
    }

    #[test]
    fn test_generate_stats_missing_column_fails() {
        let mut ds = dataset(vec![["A", "Dexes", "AMM", "1", "Swap"]]);
        ds.table.columns[2] = "segment".to_string();

        let err = generate_stats(&ds).unwrap_err();
        match err {
            AnalyzerError::MissingColumn { column, available } => {
                assert_eq!(column, "subcategory");
                assert!(available.contains("segment: text"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_entries_order() {
        let ds = dataset(vec![["A", "Dexes", "AMM", "1", "Swap"]]);
        let labels: Vec<&str> = generate_stats(&ds)
            .unwrap()
            .entries()
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Total Protocols",
                "Total TVL",
                "Average TVL",
                "Median TVL",
                "Categories",
                "Subcategories",
                "Functions"
            ]
        );
    }

    #[test]
    fn test_render_stats_markdown() {
        let report = StatsReport {
            total_protocols: 1_234,
            total_tvl: 1_234_567.891,
            average_tvl: 1_000.0,
            median_tvl: 10.0,
            categories: 4,
            subcategories: 9,
            functions: 12,
        };
        let md = render_stats_markdown(&report);
        assert!(md.starts_with("# DeFi Protocol Statistics\n\n"));
        assert!(md.contains("- **Total Protocols:** 1,234\n"));
        assert!(md.contains("- **Total TVL:** 1,234,567.89\n"));
        assert!(md.contains("- **Functions:** 12\n"));
        assert_eq!(md.lines().filter(|l| l.starts_with("- **")).count(), 7);
        assert!(md.ends_with("12\n"));
    }

    #[test]
    fn test_write_stats_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let ds = dataset(vec![["A", "Dexes", "AMM", "$2,000", "Swap"]]);
        write_stats_json(&generate_stats(&ds).unwrap(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_protocols"], 1);
        assert_eq!(value["total_tvl"], 2000.0);
    }
}
