//! Classification of non-empty `.err` artifacts.

use anyhow::Result;
use schedlab_core::{ensure_dir, write_text};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// All three must appear for a file to count as a verification failure.
pub const VERIFICATION_MARKERS: [&str; 3] = ["At time ", "is broken.\n\t", "CAT-Verify"];

pub const VERIFICATION_FILE: &str = "verification_errors.txt";
pub const SUMMARY_FILE: &str = "error_summary.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Verification,
    Other,
}

pub fn classify(text: &str) -> ErrorClass {
    if VERIFICATION_MARKERS.iter().all(|m| text.contains(m)) {
        ErrorClass::Verification
    } else {
        ErrorClass::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriagedError {
    pub path: PathBuf,
    pub text: String,
    pub class: ErrorClass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriageCounts {
    pub verification: usize,
    pub other: usize,
}

pub fn triage_errors(paths: &[PathBuf]) -> Vec<TriagedError> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                out.push(TriagedError {
                    path: path.clone(),
                    class: classify(&text),
                    text,
                });
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping unreadable error file");
            }
        }
    }
    out
}

fn render_entries<'a>(entries: impl Iterator<Item = &'a TriagedError>) -> String {
    let mut body = String::new();
    for entry in entries {
        body.push_str(&entry.path.display().to_string());
        body.push('\n');
        body.push_str(&entry.text);
        body.push_str("\n\n\n");
    }
    body
}

pub fn write_triage(out_dir: &Path, triaged: &[TriagedError]) -> Result<TriageCounts> {
    ensure_dir(out_dir)?;
    let of_class = |class: ErrorClass| triaged.iter().filter(move |t| t.class == class);
    write_text(
        &out_dir.join(VERIFICATION_FILE),
        &render_entries(of_class(ErrorClass::Verification)),
    )?;
    write_text(
        &out_dir.join(SUMMARY_FILE),
        &render_entries(of_class(ErrorClass::Other)),
    )?;
    let counts = TriageCounts {
        verification: of_class(ErrorClass::Verification).count(),
        other: of_class(ErrorClass::Other).count(),
    };
    if counts.verification + counts.other > 0 {
        info!(
            dir = %out_dir.display(),
            verification = counts.verification,
            other = counts.other,
            "error artifacts triaged"
        );
    }
    Ok(counts)
}
