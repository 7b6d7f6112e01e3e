//! Directory scan over per-run `.out` and `.err` files.

use anyhow::{anyhow, Context, Result};
use schedlab_core::{read_records_csv, ConfFlag, RawRecord, RecordError, RunRecord, Schema};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub lines: Vec<Vec<String>>,
    pub error_files: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl ScanOutcome {
    /// Maps every line onto `schema`. The first line with the wrong field
    /// count fails the whole batch.
    pub fn into_rows(self, schema: Schema) -> Result<Vec<RawRecord>, RecordError> {
        self.lines
            .into_iter()
            .enumerate()
            .map(|(idx, fields)| {
                RawRecord::from_fields(fields, schema).map_err(|e| RecordError::Row {
                    row: idx,
                    source: Box::new(e),
                })
            })
            .collect()
    }
}

fn first_line(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn scan_result_dir(dir: &Path) -> Result<ScanOutcome> {
    if !dir.is_dir() {
        return Err(anyhow!("results directory not found: {}", dir.display()));
    }
    let mut outcome = ScanOutcome::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("out") => match first_line(path) {
                Ok(line) if line.is_empty() => {
                    debug!(file = %path.display(), "empty result file");
                }
                Ok(line) => outcome
                    .lines
                    .push(line.split(';').map(str::to_string).collect()),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping unreadable result file");
                    outcome.skipped.push(path.to_path_buf());
                }
            },
            Some("err") => match entry.metadata() {
                Ok(meta) if meta.len() > 0 => outcome.error_files.push(path.to_path_buf()),
                Ok(_) => {}
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping unreadable error file");
                    outcome.skipped.push(path.to_path_buf());
                }
            },
            _ => {}
        }
    }
    debug!(
        dir = %dir.display(),
        lines = outcome.lines.len(),
        error_files = outcome.error_files.len(),
        skipped = outcome.skipped.len(),
        "scanned results directory"
    );
    Ok(outcome)
}

/// Loads a merged CSV from `dir`, appending `.csv` to `name` when it has no
/// extension yet. Error text is dropped from every row.
pub fn load_merged_csv(dir: &Path, name: &str) -> Result<(Vec<RunRecord>, Vec<ConfFlag>)> {
    let file = if name.ends_with(".csv") {
        name.to_string()
    } else {
        format!("{}.csv", name)
    };
    let path = dir.join(file);
    info!(path = %path.display(), "loading records from merged csv");
    let (mut records, flags) = read_records_csv(&path)?;
    for record in &mut records {
        record.error_text = None;
    }
    Ok((records, flags))
}
