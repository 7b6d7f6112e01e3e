use anyhow::Result;
use clap::{Parser, Subcommand};
use schedlab_runner::{AnalysisSummary, Config, Driver, ReportMode, UsageError};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "schedlab",
    version = "0.3.0",
    about = "Tables and charts for scheduling experiment results"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    results_root: Option<PathBuf>,
    /// Skip PNG rendering; CSV and LaTeX output is unchanged.
    #[arg(long, global = true)]
    no_charts: bool,
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Analyse { subdir: String, csv_file: String },
    #[command(name = "csv_analyse")]
    CsvAnalyse { subdir: String, csv_file: String },
    Merge {
        subdir: String,
        #[arg(required = true)]
        files: Vec<String>,
    },
    Csvmerge {
        subdir: String,
        #[arg(required = true)]
        files: Vec<String>,
    },
    New { subdir: String },
    /// Any other first argument names experiment directories to scan.
    /// Global flags go before the experiment names.
    #[command(external_subcommand)]
    Batch(Vec<String>),
}

impl Commands {
    fn into_mode(self) -> Result<ReportMode, UsageError> {
        Ok(match self {
            Commands::Analyse { subdir, csv_file } => ReportMode::Analyse { subdir, csv_file },
            Commands::CsvAnalyse { subdir, csv_file } => {
                ReportMode::CsvAnalyse { subdir, csv_file }
            }
            Commands::Merge { subdir, files } => ReportMode::Merge { subdir, files },
            Commands::Csvmerge { subdir, files } => ReportMode::CsvMerge { subdir, files },
            Commands::New { subdir } => ReportMode::Fresh { subdir },
            Commands::Batch(experiments) => return ReportMode::from_args(&experiments),
        })
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let json_mode = cli.json;
    match run(cli) {
        Ok(summary) => {
            if json_mode {
                emit_json(&json!({
                    "ok": true,
                    "command": summary.mode,
                    "summary": summary_to_json(&summary),
                }));
            } else {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(err) => {
            if json_mode {
                let code = if err.downcast_ref::<UsageError>().is_some() {
                    "usage_error"
                } else {
                    "command_failed"
                };
                emit_json(&json_error(code, format!("{:#}", err), json!({})));
                std::process::exit(1);
            }
            Err(err)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<AnalysisSummary> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(root) = cli.results_root {
        config.results_root = root;
    }
    if cli.no_charts {
        config.charts.render = false;
    }
    let mode = cli.command.into_mode()?;
    debug!(
        mode = mode.name(),
        results_root = %config.results_root.display(),
        charts = config.charts.render,
        "starting analysis"
    );
    let driver = Driver::new(config)?;
    driver.run(&mode)
}

fn print_summary(summary: &AnalysisSummary) {
    println!("mode: {}", summary.mode);
    for dir in &summary.out_dirs {
        println!("out_dir: {}", dir.display());
    }
    println!("records_loaded: {}", summary.records_loaded);
    println!("records_analysed: {}", summary.records_analysed);
    if summary.conf_flags > 0 {
        println!("conf_flags: {}", summary.conf_flags);
    }
    if summary.renamed > 0 || summary.dropped_duplicates > 0 {
        println!(
            "normalized: {} renamed, {} duplicates dropped",
            summary.renamed, summary.dropped_duplicates
        );
    }
    if summary.skipped_files > 0 {
        println!("skipped_files: {}", summary.skipped_files);
    }
    println!(
        "error_files: {} verification, {} other",
        summary.triage.verification, summary.triage.other
    );
    println!("artifacts: {}", summary.artifacts.len());
}

fn summary_to_json(summary: &AnalysisSummary) -> Value {
    serde_json::to_value(summary).unwrap_or_else(|e| {
        json!({
            "mode": summary.mode,
            "serialization_error": e.to_string(),
        })
    })
}

fn emit_json(value: &Value) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!(
            "{{\"ok\":false,\"error\":{{\"code\":\"serialization_error\",\"message\":\"failed to serialize JSON payload\",\"details\":{{}}}}}}"
        ),
    }
}

fn json_error(code: &str, message: String, details: Value) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}
