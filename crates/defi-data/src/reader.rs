//! CSV loading and cleaning for protocol exports.
//!
//! Reads the source CSV into a [`RawTable`] with lowercase headers, then
//! resolves the required columns, coerces the TVL column to plain numbers and
//! builds the [`ProtocolRecord`]s every downstream stage consumes.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use defi_core::config::ColumnConfig;
use defi_core::error::{AnalyzerError, Result};
use defi_core::models::ProtocolRecord;
use tracing::{debug, info, warn};

// ── TVL cleaning ──────────────────────────────────────────────────────────────

/// Parse a TVL cell such as `"$1,234.56"`.
///
/// Currency symbols and thousands separators are stripped before parsing.
/// Returns `None` for anything that is not a finite, non-negative number.
pub fn parse_tvl(raw: &str) -> Option<f64> {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let value = stripped.trim().parse::<f64>().ok()?;
    // abs() folds -0.0 into 0.0; negatives are rejected before it applies.
    (value.is_finite() && value >= 0.0).then_some(value.abs())
}

/// Clean a TVL cell, coercing malformed values to `0.0`.
///
/// ```
/// use defi_data::reader::clean_tvl;
///
/// assert_eq!(clean_tvl("$1,234.56"), 1234.56);
/// assert_eq!(clean_tvl("n/a"), 0.0);
/// ```
pub fn clean_tvl(raw: &str) -> f64 {
    parse_tvl(raw).unwrap_or(0.0)
}

// ── Column types ──────────────────────────────────────────────────────────────

/// Coarse data type of a column, inferred from its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every non-empty cell parses as a number (after currency stripping).
    Numeric,
    /// At least one non-empty cell is not numeric.
    Text,
    /// No cell has content.
    Empty,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Empty => "empty",
        }
    }
}

/// Infer the [`ColumnType`] of a sequence of cells.
pub fn infer_column_type<'a>(cells: impl IntoIterator<Item = &'a str>) -> ColumnType {
    let mut seen_value = false;
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        seen_value = true;
        let stripped: String = cell.chars().filter(|c| !matches!(c, '$' | ',')).collect();
        if stripped.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }
    if seen_value {
        ColumnType::Numeric
    } else {
        ColumnType::Empty
    }
}

// ── RawTable ──────────────────────────────────────────────────────────────────

/// A CSV file held in memory with lowercase, trimmed header names.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Where the table was read from (used in error messages).
    pub source: PathBuf,
    pub columns: Vec<String>,
    /// Rows padded or truncated to `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from in-memory parts, normalising header case and row
    /// widths the same way [`load_table`] does.
    pub fn new(
        source: impl Into<PathBuf>,
        columns: impl IntoIterator<Item = impl AsRef<str>>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            source: source.into(),
            columns,
            rows,
        }
    }

    /// Position of `name` (case-insensitive) among the columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.columns.iter().position(|c| *c == wanted)
    }

    /// Position of `name`, or a [`AnalyzerError::MissingColumn`] describing
    /// every available column and its data type.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| self.missing_column(name.trim().to_lowercase()))
    }

    /// Cells of column `idx`, top to bottom.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[idx].as_str())
    }

    /// `name: type` for every column, comma separated.
    pub fn describe_columns(&self) -> String {
        if self.columns.is_empty() {
            return "none".to_string();
        }
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                format!("{}: {}", name, infer_column_type(self.column_cells(idx)).as_str())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn missing_column(&self, column: String) -> AnalyzerError {
        AnalyzerError::MissingColumn {
            column,
            available: self.describe_columns(),
        }
    }

    /// Resolve the required columns, clean the TVL column in place and build
    /// one [`ProtocolRecord`] per row.
    pub fn into_dataset(mut self, config: &ColumnConfig) -> Result<Dataset> {
        let protocol_idx = self.require_column(&config.protocol)?;
        let category_idx = self.require_column(&config.category)?;
        let subcategory_idx = self.require_column(&config.subcategory)?;
        let tvl_idx = self.require_column(&config.tvl)?;

        let candidates = config.function_candidates();
        let function_idx = candidates
            .iter()
            .find_map(|name| self.column_index(name))
            .ok_or_else(|| self.missing_column(candidates.join(" | ")))?;

        let mut coerced = 0usize;
        let mut records = Vec::with_capacity(self.rows.len());

        for (line, row) in self.rows.iter_mut().enumerate() {
            let raw_tvl = row[tvl_idx].trim();
            let tvl = match parse_tvl(raw_tvl) {
                Some(v) => v,
                None => {
                    if !raw_tvl.is_empty() {
                        coerced += 1;
                        debug!("Row {}: coercing TVL {:?} to 0", line + 1, raw_tvl);
                    }
                    0.0
                }
            };
            row[tvl_idx] = tvl.to_string();

            let function_text = row[function_idx].trim();
            records.push(ProtocolRecord {
                protocol: row[protocol_idx].trim().to_string(),
                category: row[category_idx].trim().to_string(),
                subcategory: row[subcategory_idx].trim().to_string(),
                tvl,
                raw_function_text: (!function_text.is_empty()).then(|| function_text.to_string()),
            });
        }

        if coerced > 0 {
            warn!(
                "{} malformed TVL value(s) in {} coerced to 0",
                coerced,
                self.source.display()
            );
        }

        let schema = ResolvedColumns {
            protocol: self.columns[protocol_idx].clone(),
            category: self.columns[category_idx].clone(),
            subcategory: self.columns[subcategory_idx].clone(),
            tvl: self.columns[tvl_idx].clone(),
            function: self.columns[function_idx].clone(),
        };

        Ok(Dataset {
            table: self,
            schema,
            records,
            coerced_tvl_cells: coerced,
        })
    }
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// Names of the columns the loader resolved, as they appear in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub protocol: String,
    pub category: String,
    pub subcategory: String,
    pub tvl: String,
    pub function: String,
}

/// The cleaned table plus its typed records. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Cleaned table: lowercase headers, TVL column holds plain numbers.
    pub table: RawTable,
    pub schema: ResolvedColumns,
    pub records: Vec<ProtocolRecord>,
    /// Non-empty TVL cells that could not be parsed.
    pub coerced_tvl_cells: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the cleaned table (every source column) to `path`.
    pub fn write_cleaned_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| AnalyzerError::csv(path, e))?;
        writer
            .write_record(&self.table.columns)
            .map_err(|e| AnalyzerError::csv(path, e))?;
        for row in &self.table.rows {
            writer
                .write_record(row)
                .map_err(|e| AnalyzerError::csv(path, e))?;
        }
        writer.flush().map_err(|e| AnalyzerError::file(path, e))?;
        info!("Saved cleaned data to {}", path.display());
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read a CSV file with a header row into a [`RawTable`].
///
/// Short rows are padded with empty cells and long rows truncated to the
/// header width.
pub fn load_table(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|e| AnalyzerError::file(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AnalyzerError::csv(path, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    let mut ragged = 0usize;
    for result in reader.records() {
        let record = result.map_err(|e| AnalyzerError::csv(path, e))?;
        if record.len() != headers.len() {
            ragged += 1;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    if ragged > 0 {
        warn!(
            "{} row(s) in {} did not match the header width",
            ragged,
            path.display()
        );
    }

    let table = RawTable::new(path, &headers, rows);
    debug!(
        "Loaded {} rows with columns {:?} from {}",
        table.rows.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

/// Load and clean `path` in one step.
pub fn load_dataset(path: &Path, columns: &ColumnConfig) -> Result<Dataset> {
    let dataset = load_table(path)?.into_dataset(columns)?;
    info!(
        "Loaded {} protocols from {}",
        dataset.len(),
        path.display()
    );
    Ok(dataset)
}

/// Count rows per distinct non-empty value of column `idx`.
pub(crate) fn value_counts(table: &RawTable, idx: usize) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for cell in table.column_cells(idx) {
        let cell = cell.trim();
        if !cell.is_empty() {
            *counts.entry(cell.to_string()).or_default() += 1;
        }
    }
    counts
}

// ── Tests ─────────────────────────────────────────────────────────────────────
