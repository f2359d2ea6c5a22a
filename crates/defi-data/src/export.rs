//! CSV exports of the derived tables.

use std::path::Path;

use defi_core::error::{AnalyzerError, Result};
use serde::Serialize;
use tracing::info;

/// Serialize `rows` to `path` with a header row taken from the field names.
///
/// An empty slice produces an empty file.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| AnalyzerError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AnalyzerError::csv(path, e))?;
    }
    writer.flush().map_err(|e| AnalyzerError::file(path, e))?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
