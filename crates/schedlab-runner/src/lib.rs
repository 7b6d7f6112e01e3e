//! Result-directory ingestion, error triage and report orchestration.

pub mod config;
pub mod driver;
pub mod scan;
pub mod triage;

pub use config::{Config, ConfigError};
pub use driver::{AnalysisSummary, Driver, ReportMode, UsageError};
pub use scan::{load_merged_csv, scan_result_dir, ScanOutcome};
pub use triage::{classify, triage_errors, write_triage, ErrorClass, TriageCounts, TriagedError};
