use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    ChartConfig, ClassifierConfig, ColumnConfig, LpMatching, OutputPaths, PairMode, RunConfig,
    ScoringConfig, DEFAULT_SYNERGY_THRESHOLD,
};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Descriptive analytics and composability scoring for DeFi protocol exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "defi-analyzer",
    about = "Descriptive analytics and composability scoring for DeFi protocol exports",
    version
)]
pub struct Settings {
    /// Source CSV with Protocol, Category, Subcategory, TVL and a function column
    #[arg(default_value = "solana.csv")]
    pub input: PathBuf,

    /// Directory that receives the report, CSV exports and charts
    #[arg(long, short = 'o', default_value = "output/defi-analysis")]
    pub output_dir: PathBuf,

    /// Name of the free-text function column (case-insensitive)
    #[arg(long)]
    pub function_column: Option<String>,

    /// Match "lp" only as a whole word when classifying functions
    #[arg(long)]
    pub whole_word_lp: bool,

    /// Only keep category pairs whose synergy score exceeds this value
    #[arg(long, default_value_t = DEFAULT_SYNERGY_THRESHOLD, allow_negative_numbers = true)]
    pub synergy_threshold: f64,

    /// Report each category pair once instead of in both orders
    #[arg(long)]
    pub unique_pairs: bool,

    /// Number of entries in "top" charts and report tables (1-100)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u16).range(1..=100))]
    pub top_n: u16,

    /// Skip PNG chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::load_from(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Build the explicit per-run configuration.
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            input: self.input.clone(),
            output: OutputPaths::new(&self.output_dir),
            columns: ColumnConfig {
                function: self.function_column.clone(),
                ..ColumnConfig::default()
            },
            classifier: ClassifierConfig {
                lp_matching: if self.whole_word_lp {
                    LpMatching::WholeWord
                } else {
                    LpMatching::Substring
                },
            },
            scoring: ScoringConfig {
                threshold: self.synergy_threshold,
                pair_mode: if self.unique_pairs {
                    PairMode::Unordered
                } else {
                    PairMode::Ordered
                },
            },
            charts: ChartConfig {
                enabled: !self.no_charts,
                top_n: usize::from(self.top_n),
                ..ChartConfig::default()
            },
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
