use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::codec;
use crate::dataset::Dataset;
use crate::domain::BrowseError;

/// Serializes `rows` (all of them, no paging) restricted to `visible_columns`
/// in that order. Returns `None` when there is nothing to export.
pub fn export(
    dataset: &Dataset,
    rows: &[usize],
    visible_columns: &[String],
) -> Result<Option<String>, BrowseError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let projected: Vec<Vec<&str>> = rows
        .iter()
        .map(|&ridx| {
            visible_columns
                .iter()
                .map(|field| dataset.value(ridx, field))
                .collect()
        })
        .collect();
    codec::serialize(visible_columns, &projected).map(Some)
}

/// `people.v2.csv` becomes `people_filtered.csv`.
pub fn export_file_name(original_name: &str) -> String {
    let file_name = Path::new(original_name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(original_name);
    let base = file_name.split('.').next().unwrap_or("");
    let base = if base.is_empty() { "data" } else { base };
    format!("{base}_filtered.csv")
}

#[instrument(skip(content))]
pub fn write_export(dir: &Path, original_name: &str, content: &str) -> Result<PathBuf, BrowseError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(original_name));
    fs::write(&path, content.as_bytes())?;
    info!("Exported {} bytes to {:?}", content.len(), path);
    Ok(path)
}
