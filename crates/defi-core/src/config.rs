//! Explicit per-run configuration handed to every pipeline component.
//!
//! Nothing in the analyzer reads process-wide path constants or global state;
//! the binary builds a [`RunConfig`] from [`crate::settings::Settings`] and
//! passes the relevant piece into each stage.

use std::path::{Path, PathBuf};

use crate::error::{AnalyzerError, Result};

/// Default synergy score threshold; only pairs scoring above it are kept.
pub const DEFAULT_SYNERGY_THRESHOLD: f64 = 0.5;

/// Default number of entries shown in "top N" charts and report tables.
pub const DEFAULT_TOP_N: usize = 10;

/// Column aliases tried, in order, when no function column is configured.
pub const FUNCTION_COLUMN_ALIASES: [&str; 3] = ["what can be done today", "function", "functions"];

// ── Columns ───────────────────────────────────────────────────────────────────

/// Lowercase names of the columns the loader requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub protocol: String,
    pub category: String,
    pub subcategory: String,
    pub tvl: String,
    /// Explicit function-description column. `None` means "try
    /// [`FUNCTION_COLUMN_ALIASES`]".
    pub function: Option<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            protocol: "protocol".to_string(),
            category: "category".to_string(),
            subcategory: "subcategory".to_string(),
            tvl: "tvl".to_string(),
            function: None,
        }
    }
}

impl ColumnConfig {
    /// Candidate names for the function column, in lookup order.
    pub fn function_candidates(&self) -> Vec<String> {
        match &self.function {
            Some(name) => vec![name.trim().to_lowercase()],
            None => FUNCTION_COLUMN_ALIASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// How the liquidity-provision rule matches the token "lp".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LpMatching {
    /// Case-insensitive substring, so "lps" and "help" both match; the
    /// historical behaviour.
    #[default]
    Substring,
    /// Only "lp" as a whole word.
    WholeWord,
}

/// Options for the function classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifierConfig {
    pub lp_matching: LpMatching,
}

// ── Scoring ───────────────────────────────────────────────────────────────────

/// How the pairwise synergy scan treats the two orderings of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairMode {
    /// Emit both `(A, B)` and `(B, A)`; the historical behaviour.
    #[default]
    Ordered,
    /// Emit each unordered pair once, as `(A, B)` with A before B in the
    /// aggregate ordering.
    Unordered,
}

/// Parameters for the opportunity scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Pairs must score strictly above this value.
    pub threshold: f64,
    pub pair_mode: PairMode,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SYNERGY_THRESHOLD,
            pair_mode: PairMode::Ordered,
        }
    }
}

// ── Charts ────────────────────────────────────────────────────────────────────

/// Chart rendering options.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub enabled: bool,
    /// Bitmap size in pixels.
    pub width: u32,
    pub height: u32,
    /// Number of bars in the top-protocols chart.
    pub top_n: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 1500,
            height: 800,
            top_n: DEFAULT_TOP_N,
        }
    }
}

// ── Output paths ──────────────────────────────────────────────────────────────

/// Every artifact location, derived from one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub base_dir: PathBuf,
}

impl OutputPaths {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.base_dir.join("charts")
    }

    pub fn cleaned_csv(&self) -> PathBuf {
        self.base_dir.join("cleaned_data.csv")
    }

    pub fn function_analysis_csv(&self) -> PathBuf {
        self.base_dir.join("function_analysis.csv")
    }

    pub fn function_summary_csv(&self) -> PathBuf {
        self.base_dir.join("function_summary.csv")
    }

    pub fn category_aggregates_csv(&self) -> PathBuf {
        self.base_dir.join("category_aggregates.csv")
    }

    pub fn opportunities_csv(&self) -> PathBuf {
        self.base_dir.join("opportunities.csv")
    }

    pub fn stats_json(&self) -> PathBuf {
        self.base_dir.join("stats.json")
    }

    pub fn stats_markdown(&self) -> PathBuf {
        self.base_dir.join("defi_stats.md")
    }

    pub fn report(&self) -> PathBuf {
        self.base_dir.join("analysis.md")
    }

    /// Create the base and chart directories (including missing parents).
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.base_dir.clone(), self.charts_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| AnalyzerError::file(&dir, e))?;
        }
        Ok(())
    }

    /// Express `path` relative to the base directory, for report links.
    /// Paths outside the base directory are returned unchanged.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.base_dir).unwrap_or(path)
    }
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// Complete configuration for one analyzer run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: OutputPaths,
    pub columns: ColumnConfig,
    pub classifier: ClassifierConfig,
    pub scoring: ScoringConfig,
    pub charts: ChartConfig,
}

impl RunConfig {
    /// Default configuration for `input`, writing into `output_dir`.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: OutputPaths::new(output_dir),
            columns: ColumnConfig::default(),
            classifier: ClassifierConfig::default(),
            scoring: ScoringConfig::default(),
            charts: ChartConfig::default(),
        }
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        if !self.scoring.threshold.is_finite() {
            return Err(AnalyzerError::Config(format!(
                "synergy threshold must be finite, got {}",
                self.scoring.threshold
            )));
        }
        if self.charts.top_n == 0 {
            return Err(AnalyzerError::Config("top-n must be at least 1".to_string()));
        }
        if self.charts.width == 0 || self.charts.height == 0 {
            return Err(AnalyzerError::Config(
                "chart dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
