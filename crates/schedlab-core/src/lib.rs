//! Shared record model and filesystem helpers for schedlab.

pub mod error;
pub mod record;

pub use error::RecordError;
pub use record::{
    coerce_all, flag_non_integer_conf, read_records_csv, write_records_csv, ConfFlag, Outcome,
    RawRecord, RunRecord, Schema, MAKESPAN_EXHAUSTED,
};

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(())
}

/// Writes `bytes` to a sibling temp file and renames it over `path`, so a
/// reader never observes a half-written artifact.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let ts = Utc::now().timestamp_micros();
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, ts));
    let mut file =
        fs::File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    atomic_write_bytes(path, text.as_bytes())
}

/// Scratch directory helper shared by the test suites of the workspace.
#[doc(hidden)]
pub fn scratch_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "schedlab_{}_{}_{}",
        tag,
        std::process::id(),
        Utc::now().timestamp_micros()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_is_idempotent() {
        let root = scratch_dir("ensure_dir");
        let nested = root.join("a").join("b");
        ensure_dir(&nested).expect("first create");
        ensure_dir(&nested).expect("second create must not fail");
        assert!(nested.is_dir());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp_files() {
        let root = scratch_dir("atomic_write");
        let target = root.join("out").join("summary.txt");
        atomic_write_bytes(&target, b"first").expect("write");
        write_text(&target, "second").expect("overwrite");
        assert_eq!(fs::read_to_string(&target).expect("read"), "second");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .expect("list")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind");
        let _ = fs::remove_dir_all(root);
    }
}
