use crate::config::Config;
use crate::scan::{load_merged_csv, scan_result_dir};
use crate::triage::{triage_errors, write_triage, TriageCounts, SUMMARY_FILE, VERIFICATION_FILE};
use anyhow::{Context, Result};
use chrono::Utc;
use schedlab_analysis::partition::select;
use schedlab_analysis::{
    heuristic_tables, instance_groups, instance_table, normalize, solved, unsolved, Canvas,
    Filter, Metric, NormalizeReport, Predicate, Reporter,
};
use schedlab_core::{
    coerce_all, ensure_dir, flag_non_integer_conf, read_records_csv, write_records_csv, RunRecord,
    Schema,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Labels without any of these count as heuristics.
const DFS_LABELS: &str = "DFS|CatDfs";
/// Exhaustive searches, including the exploration-factor variants.
const DFS_FAMILY: &str = "DFS|CatDfs|E";
const DFS_COMPARISON: &str = "DFS|CatDfs|E|Cat*";
const CATEGORY_LABELS: &str = "Cat*";
const FINAL_CANDIDATES: &str = "RPT-T|E = 5|DFS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("no arguments: expected a mode or at least one experiment directory")]
    NoArguments,
    #[error("{mode}: missing <{argument}>")]
    MissingArgument {
        mode: &'static str,
        argument: &'static str,
    },
    #[error("{mode}: unexpected argument {value:?}")]
    UnexpectedArgument { mode: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportMode {
    Batch { experiments: Vec<String> },
    Analyse { subdir: String, csv_file: String },
    CsvAnalyse { subdir: String, csv_file: String },
    Merge { subdir: String, files: Vec<String> },
    CsvMerge { subdir: String, files: Vec<String> },
    Fresh { subdir: String },
}

impl ReportMode {
    /// Reads the mode from positional arguments. A first argument that is
    /// not a mode name starts a batch over every argument.
    pub fn from_args(args: &[String]) -> Result<Self, UsageError> {
        let (first, rest) = args.split_first().ok_or(UsageError::NoArguments)?;
        let mode = match first.as_str() {
            "analyse" => "analyse",
            "csv_analyse" => "csv_analyse",
            "merge" => "merge",
            "csvmerge" => "csvmerge",
            "new" => "new",
            _ => {
                if let Some(flag) = args.iter().find(|a| a.starts_with("--")) {
                    return Err(UsageError::UnexpectedArgument {
                        mode: "batch",
                        value: flag.clone(),
                    });
                }
                return Ok(ReportMode::Batch {
                    experiments: args.to_vec(),
                });
            }
        };
        let mut rest = rest.iter();
        let mut required = |argument: &'static str| {
            rest.next()
                .cloned()
                .ok_or(UsageError::MissingArgument { mode, argument })
        };
        let parsed = match mode {
            "analyse" => ReportMode::Analyse {
                subdir: required("subdir")?,
                csv_file: required("csv_file")?,
            },
            "csv_analyse" => ReportMode::CsvAnalyse {
                subdir: required("subdir")?,
                csv_file: required("csv_file")?,
            },
            "merge" | "csvmerge" => {
                let subdir = required("subdir")?;
                let files: Vec<String> = rest.by_ref().cloned().collect();
                if files.is_empty() {
                    return Err(UsageError::MissingArgument {
                        mode,
                        argument: "file",
                    });
                }
                if mode == "merge" {
                    ReportMode::Merge { subdir, files }
                } else {
                    ReportMode::CsvMerge { subdir, files }
                }
            }
            _ => ReportMode::Fresh {
                subdir: required("subdir")?,
            },
        };
        if let Some(value) = rest.next() {
            return Err(UsageError::UnexpectedArgument {
                mode,
                value: value.clone(),
            });
        }
        Ok(parsed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportMode::Batch { .. } => "batch",
            ReportMode::Analyse { .. } => "analyse",
            ReportMode::CsvAnalyse { .. } => "csv_analyse",
            ReportMode::Merge { .. } => "merge",
            ReportMode::CsvMerge { .. } => "csvmerge",
            ReportMode::Fresh { .. } => "new",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub mode: String,
    pub started_at: String,
    pub out_dirs: Vec<PathBuf>,
    pub records_loaded: usize,
    pub records_analysed: usize,
    pub conf_flags: usize,
    pub renamed: usize,
    pub dropped_duplicates: usize,
    pub skipped_files: usize,
    pub triage: TriageCounts,
    pub artifacts: Vec<PathBuf>,
}

struct Session<'a> {
    reporter: &'a Reporter,
    canvas: Canvas,
    summary: AnalysisSummary,
}

impl<'a> Session<'a> {
    fn new(reporter: &'a Reporter, mode: &ReportMode) -> Self {
        Session {
            reporter,
            canvas: Canvas::blank(),
            summary: AnalysisSummary {
                mode: mode.name().to_string(),
                started_at: Utc::now().to_rfc3339(),
                ..AnalysisSummary::default()
            },
        }
    }

    fn wrote(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.summary.artifacts.extend(paths);
    }

    fn out_dir(&mut self, dir: &Path) -> Result<()> {
        ensure_dir(dir)?;
        self.summary.out_dirs.push(dir.to_path_buf());
        Ok(())
    }

    fn loaded(&mut self, records: usize, conf_flags: usize) {
        self.summary.records_loaded += records;
        self.summary.conf_flags += conf_flags;
    }

    fn normalized(&mut self, report: NormalizeReport) {
        self.summary.renamed += report.renamed;
        self.summary.dropped_duplicates += report.dropped_duplicates;
    }

    fn dump(&mut self, path: PathBuf, records: &[RunRecord], schema: Schema) -> Result<()> {
        write_records_csv(&path, records, schema)?;
        self.wrote([path]);
        Ok(())
    }

    fn metric(&mut self, records: &[RunRecord], metric: Metric, dir: &Path, name: &str) -> Result<()> {
        let canvas = std::mem::take(&mut self.canvas);
        let (canvas, artifacts) = self
            .reporter
            .metric_report(canvas, records, metric, dir, name)?;
        self.canvas = canvas;
        self.wrote(artifacts.paths());
        Ok(())
    }

    fn conf(&mut self, records: &[RunRecord], dir: &Path, name: &str) -> Result<()> {
        self.metric(records, Metric::Conf, dir, name)?;
        let table = instance_table(records, dir, &format!("{}_instances", name))?;
        self.wrote([table]);
        Ok(())
    }

    fn overall(&mut self, records: &[RunRecord], dir: &Path) -> Result<()> {
        self.metric(records, Metric::Makespan, dir, "makespan")?;
        self.conf(records, dir, "conf")?;
        self.metric(records, Metric::Time, dir, "time")
    }

    fn dfs_reports(&mut self, records: &[RunRecord], dir: &Path) -> Result<()> {
        let dfs = select(records, Predicate::algorithm_contains(DFS_FAMILY));
        self.conf(&dfs, dir, "dfs_conf")?;
        self.metric(&dfs, Metric::Time, dir, "dfs_time")
    }

    fn makespan_and_dfs(&mut self, records: &[RunRecord], dir: &Path) -> Result<()> {
        self.metric(records, Metric::Makespan, dir, "makespan")?;
        self.dfs_reports(records, dir)
    }

    fn comparisons(&mut self, records: &[RunRecord], dir: &Path) -> Result<()> {
        ensure_dir(dir)?;
        self.dump(dir.join("all.csv"), records, Schema::Base)?;
        let heuristics = select(records, Predicate::algorithm_lacks(DFS_LABELS));
        self.metric(&heuristics, Metric::Time, dir, "heuristics_time")?;
        self.metric(&heuristics, Metric::Conf, dir, "heuristics_conf")?;
        self.dfs_reports(records, dir)
    }

    fn unsolved(&mut self, records: &[RunRecord], dir: &Path) -> Result<()> {
        let canvas = std::mem::take(&mut self.canvas);
        let (canvas, written) = self.reporter.unsolved_report(canvas, records, dir)?;
        self.canvas = canvas;
        self.wrote(written);
        Ok(())
    }

    fn finish(self) -> AnalysisSummary {
        self.summary
    }
}

#[derive(Debug, Clone)]
pub struct Driver {
    config: Config,
    reporter: Reporter,
}

impl Driver {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Driver {
            reporter: Reporter::new(config.charts),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self, mode: &ReportMode) -> Result<AnalysisSummary> {
        let mut session = Session::new(&self.reporter, mode);
        match mode {
            ReportMode::Batch { experiments } => {
                for experiment in experiments {
                    self.batch(&mut session, experiment)
                        .with_context(|| format!("experiment {} failed", experiment))?;
                }
            }
            ReportMode::Analyse { subdir, csv_file } => {
                self.analyse(&mut session, subdir, csv_file)?
            }
            ReportMode::CsvAnalyse { subdir, csv_file } => {
                self.csv_analyse(&mut session, subdir, csv_file)?
            }
            ReportMode::Merge { subdir, files } => self.merge(&mut session, subdir, files)?,
            ReportMode::CsvMerge { subdir, files } => self.csv_merge(&mut session, subdir, files)?,
            ReportMode::Fresh { subdir } => self.fresh(&mut session, subdir)?,
        }
        let summary = session.finish();
        info!(
            mode = %summary.mode,
            loaded = summary.records_loaded,
            analysed = summary.records_analysed,
            artifacts = summary.artifacts.len(),
            "analysis complete"
        );
        Ok(summary)
    }

    fn dir(&self, subdir: &str) -> PathBuf {
        self.config.results_root.join(subdir)
    }

    fn analysable(&self) -> Filter {
        Filter::new()
            .and(Predicate::Solved)
            .and(Predicate::TimeAtMost(self.config.time_ceiling_secs))
    }

    fn only(&self, records: &[RunRecord], system: &str) -> Vec<RunRecord> {
        select(records, Predicate::only_system(system, &self.config.systems))
    }

    fn baseline_system(&self) -> &str {
        self.config.systems.first().map(String::as_str).unwrap_or("S1")
    }

    fn ingest(
        &self,
        session: &mut Session,
        in_dir: &Path,
        out: &Path,
        schema: Schema,
    ) -> Result<Vec<RunRecord>> {
        let scan = scan_result_dir(in_dir)?;
        session.summary.skipped_files += scan.skipped.len();
        session.out_dir(out)?;

        let counts = write_triage(out, &triage_errors(&scan.error_files))?;
        session.summary.triage.verification += counts.verification;
        session.summary.triage.other += counts.other;
        session.wrote([out.join(VERIFICATION_FILE), out.join(SUMMARY_FILE)]);

        let rows = scan
            .into_rows(schema)
            .with_context(|| format!("malformed result line in {}", in_dir.display()))?;
        let flags = flag_non_integer_conf(&rows);
        let records = coerce_all(rows)
            .with_context(|| format!("failed to coerce results in {}", in_dir.display()))?;
        session.loaded(records.len(), flags.len());
        info!(dir = %in_dir.display(), records = records.len(), "results scanned");
        Ok(records)
    }

    fn batch(&self, session: &mut Session, experiment: &str) -> Result<()> {
        let in_dir = self.dir(experiment);
        let out = in_dir.join("analysis");
        let records = self.ingest(session, &in_dir, &out, Schema::Base)?;
        session.dump(out.join("combine.csv"), &records, Schema::Base)?;

        session.comparisons(&records, &out)?;
        let groups = instance_groups(&records, &out)?;
        session.wrote(groups);

        let found = solved(&records);
        session.summary.records_analysed += found.len();
        session.comparisons(&found, &out.join("found_solutions"))?;
        session.unsolved(&unsolved(&records), &out.join("no_solutions"))
    }

    fn analyse(&self, session: &mut Session, subdir: &str, csv_file: &str) -> Result<()> {
        let dir = self.dir(subdir);
        let (mut records, flags) = load_merged_csv(&dir, csv_file)?;
        session.loaded(records.len(), flags.len());
        session.normalized(normalize(&mut records));
        let data = self.analysable().apply(&records);
        session.summary.records_analysed += data.len();

        let all_dir = dir.join("all");
        session.out_dir(&all_dir)?;
        session.overall(&data, &all_dir)?;
        for system in &self.config.systems {
            session.overall(&self.only(&data, system), &all_dir.join(system))?;
        }

        let dfs_dir = dir.join("dfs_comparisons");
        session.out_dir(&dfs_dir)?;
        let dfs = Filter::new()
            .and(Predicate::algorithm_contains(DFS_COMPARISON))
            .and(Predicate::system_lacks(self.baseline_system()))
            .apply(&data);
        session.makespan_and_dfs(&dfs, &dfs_dir)?;
        for system in &self.config.systems {
            session.overall(&self.only(&dfs, system), &dfs_dir.join(system))?;
        }

        let heur_dir = dir.join("heur_dfs_comp");
        session.out_dir(&heur_dir)?;
        let plain = select(&data, Predicate::algorithm_lacks("E|CatDfs"));
        let without_factor = select(&data, Predicate::algorithm_lacks("E"));
        for system in &self.config.systems {
            let view = select(&self.only(&plain, system), Predicate::algorithm_lacks("E"));
            session.overall(&view, &heur_dir.join(system))?;
            session.overall(
                &self.only(&without_factor, system),
                &heur_dir.join("all").join(system),
            )?;
        }

        let heur_only_dir = dir.join("only_heur");
        session.out_dir(&heur_only_dir)?;
        let heuristics = select(&data, Predicate::algorithm_lacks("E|CatDfs|DFS"));
        let tables = heuristic_tables(&heuristics, &heur_only_dir)?;
        session.wrote(tables);
        session.overall(&heuristics, &heur_only_dir)
    }

    fn csv_analyse(&self, session: &mut Session, subdir: &str, csv_file: &str) -> Result<()> {
        let dir = self.dir(subdir);
        let path = dir.join(csv_file);
        info!(path = %path.display(), "loading records from csv");
        let (records, flags) = read_records_csv(&path)?;
        session.loaded(records.len(), flags.len());
        let mut data = self.analysable().apply(&records);
        session.normalized(normalize(&mut data));
        session.summary.records_analysed += data.len();

        let views = [
            (
                "heuristic",
                select(&data, Predicate::algorithm_contains(CATEGORY_LABELS)),
            ),
            ("heuristicVsSDfs", data.clone()),
            (
                "all_dfs",
                select(&data, Predicate::algorithm_lacks(CATEGORY_LABELS)),
            ),
        ];
        for (name, view) in &views {
            let out = dir.join(name);
            session.out_dir(&out)?;
            session.overall(view, &out)?;
        }

        let final_dir = dir.join("e5_rptt_dfs");
        session.out_dir(&final_dir)?;
        let finalists = Filter::new()
            .and(Predicate::algorithm_contains(FINAL_CANDIDATES))
            .and(Predicate::algorithm_lacks("MRPT"))
            .apply(&data);
        session.overall(&finalists, &final_dir)?;
        for system in self.config.systems.iter().skip(1) {
            session.overall(&self.only(&finalists, system), &final_dir.join(system))?;
        }
        Ok(())
    }

    fn concat(&self, session: &mut Session, dir: &Path, files: &[String]) -> Result<Vec<RunRecord>> {
        let mut combined = Vec::new();
        for file in files {
            let (records, flags) = load_merged_csv(dir, file)?;
            session.loaded(records.len(), flags.len());
            combined.extend(records);
        }
        Ok(combined)
    }

    fn merge(&self, session: &mut Session, subdir: &str, files: &[String]) -> Result<()> {
        let dir = self.dir(subdir);
        let combined = self.concat(session, &dir, files)?;
        session.out_dir(&dir)?;
        session.dump(dir.join("combine.csv"), &combined, Schema::Extended)
    }

    fn csv_merge(&self, session: &mut Session, subdir: &str, files: &[String]) -> Result<()> {
        let dir = self.dir(subdir);
        let mut combined = self.concat(session, &dir, files)?;
        session.normalized(normalize(&mut combined));
        session.out_dir(&dir)?;
        session.dump(dir.join("combined.csv"), &combined, Schema::Extended)?;

        let found = solved(&combined);
        session.summary.records_analysed += found.len();
        session.makespan_and_dfs(&found, &dir)?;
        for system in &self.config.systems {
            session.makespan_and_dfs(&self.only(&found, system), &dir.join(system))?;
        }
        Ok(())
    }

    fn fresh(&self, session: &mut Session, subdir: &str) -> Result<()> {
        let dir = self.dir(subdir);
        ensure_dir(&dir)?;
        let out = dir.join("analysis");
        let records = self.ingest(session, &dir, &out, Schema::Extended)?;
        session.dump(out.join("combine.csv"), &records, Schema::Extended)
    }
}
