use crate::chart::{Canvas, ChartOptions};
use crate::latex::{tabular, Cell};
use anyhow::{anyhow, Context, Result};
use schedlab_core::record::format_float;
use schedlab_core::{atomic_write_bytes, ensure_dir, write_records_csv, write_text, RunRecord, Schema};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Time,
    Conf,
    Makespan,
}

impl Metric {
    pub fn column(self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Conf => "conf",
            Metric::Makespan => "makespan",
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Metric::Time => "Time (seconds)",
            Metric::Conf => "Number of configurations",
            Metric::Makespan => "Make span",
        }
    }

    pub fn is_integral(self) -> bool {
        !matches!(self, Metric::Time)
    }

    pub fn value(self, record: &RunRecord) -> f64 {
        match self {
            Metric::Time => record.time,
            Metric::Conf => record.conf as f64,
            Metric::Makespan => record.makespan() as f64,
        }
    }

    fn cell(self, value: f64) -> Cell {
        if self.is_integral() {
            Cell::Int(value as i64)
        } else {
            Cell::Float(value)
        }
    }

    fn csv_field(self, value: f64) -> String {
        if self.is_integral() {
            (value as i64).to_string()
        } else {
            format_float(value)
        }
    }
}

/// Metric values per algorithm, groups in label order, values ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroups {
    metric: Metric,
    groups: BTreeMap<String, Vec<f64>>,
}

impl MetricGroups {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get(&self, algorithm: &str) -> Option<&[f64]> {
        self.groups.get(algorithm).map(Vec::as_slice)
    }

    fn rows(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter()
            .flat_map(|(alg, values)| values.iter().map(move |v| (alg, *v)))
    }
}

pub fn group_by_algorithm(records: &[RunRecord], metric: Metric) -> MetricGroups {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.algorithm.clone())
            .or_default()
            .push(metric.value(record));
    }
    for values in groups.values_mut() {
        values.sort_by(|a, b| a.total_cmp(b));
    }
    MetricGroups { metric, groups }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub csv: PathBuf,
    pub tex: PathBuf,
    pub png: Option<PathBuf>,
}

impl ReportArtifacts {
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut out = vec![self.csv.clone()];
        out.extend(self.png.clone());
        out.push(self.tex.clone());
        out
    }
}

fn csv_bytes<I, R>(header: &[&str], rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush csv buffer: {}", e.error()))
}

#[derive(Debug, Clone, Default)]
pub struct Reporter {
    options: ChartOptions,
}

impl Reporter {
    pub fn new(options: ChartOptions) -> Self {
        Reporter { options }
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Groups `records` by algorithm on `metric` and writes `<name>.csv`,
    /// `<name>.png` and `<name>.tex` into `dir`.
    ///
    /// The incoming canvas is cleared first; the returned canvas holds the
    /// chart that was drawn for this report.
    pub fn metric_report(
        &self,
        canvas: Canvas,
        records: &[RunRecord],
        metric: Metric,
        dir: &Path,
        name: &str,
    ) -> Result<(Canvas, ReportArtifacts)> {
        ensure_dir(dir)?;
        let groups = group_by_algorithm(records, metric);
        let canvas = canvas
            .reset()
            .labelled("Index", metric.axis_label())
            .plot_groups(&groups)?;

        let csv_path = dir.join(format!("{}.csv", name));
        let bytes = csv_bytes(
            &["algorithm", metric.column()],
            groups
                .rows()
                .map(|(alg, v)| vec![alg.to_string(), metric.csv_field(v)]),
        )?;
        atomic_write_bytes(&csv_path, &bytes)?;

        let png_path = if self.options.render {
            let path = dir.join(format!("{}.png", name));
            canvas
                .render_png(&path, &self.options)
                .with_context(|| format!("failed to render {}", path.display()))?;
            Some(path)
        } else {
            None
        };

        let rows: Vec<Vec<Cell>> = groups
            .rows()
            .map(|(alg, v)| vec![Cell::Text(alg.to_string()), metric.cell(v)])
            .collect();
        let tex_path = dir.join(format!("{}.tex", name));
        write_text(&tex_path, &tabular(&["algorithm", metric.column()], &rows))?;

        debug!(
            report = name,
            dir = %dir.display(),
            groups = groups.len(),
            rows = records.len(),
            "metric report written"
        );
        Ok((
            canvas,
            ReportArtifacts {
                csv: csv_path,
                tex: tex_path,
                png: png_path,
            },
        ))
    }

    /// Report over runs without a schedule: the raw rows, the distinct
    /// problems that nobody solved, and time/configuration charts.
    pub fn unsolved_report(
        &self,
        canvas: Canvas,
        records: &[RunRecord],
        dir: &Path,
    ) -> Result<(Canvas, Vec<PathBuf>)> {
        ensure_dir(dir)?;
        let mut written = Vec::new();

        let rows_path = dir.join("no_solution.csv");
        write_records_csv(&rows_path, records, Schema::Base)?;
        written.push(rows_path);

        let problems_path = dir.join("problems_with_no_solutions.txt");
        atomic_write_bytes(&problems_path, &problems_without_solution(records)?)?;
        written.push(problems_path);

        let (canvas, time) = self.metric_report(canvas, records, Metric::Time, dir, "time")?;
        written.extend(time.paths());
        let (canvas, conf) =
            self.metric_report(canvas, records, Metric::Conf, dir, "configurations")?;
        written.extend(conf.paths());

        info!(
            dir = %dir.display(),
            runs = records.len(),
            "unsolved runs reported"
        );
        Ok((canvas, written))
    }
}

fn problems_without_solution(records: &[RunRecord]) -> Result<Vec<u8>> {
    let mut seen = HashSet::new();
    let pairs: Vec<Vec<String>> = records
        .iter()
        .filter(|r| seen.insert((r.system.clone(), r.instance)))
        .map(|r| vec![r.system.clone(), r.instance.to_string()])
        .collect();
    csv_bytes(&["system", "instance"], pairs)
}

fn by_system_instance(a: &RunRecord, b: &RunRecord) -> Ordering {
    a.system
        .cmp(&b.system)
        .then_with(|| a.instance.cmp(&b.instance))
}

/// `system,instance,algorithm,conf,makespan` rows sorted by system and
/// instance, written to `<name>.csv`.
pub fn instance_table(records: &[RunRecord], dir: &Path, name: &str) -> Result<PathBuf> {
    let mut sorted: Vec<&RunRecord> = records.iter().collect();
    sorted.sort_by(|a, b| by_system_instance(a, b));
    let bytes = csv_bytes(
        &["system", "instance", "algorithm", "conf", "makespan"],
        sorted.iter().map(|r| {
            vec![
                r.system.clone(),
                r.instance.to_string(),
                r.algorithm.clone(),
                r.conf.to_string(),
                r.makespan().to_string(),
            ]
        }),
    )?;
    let path = dir.join(format!("{}.csv", name));
    atomic_write_bytes(&path, &bytes)?;
    Ok(path)
}

/// One `groups/<system>-<instance>.csv` per problem with the time and
/// configuration count of every algorithm that ran it.
pub fn instance_groups(records: &[RunRecord], dir: &Path) -> Result<Vec<PathBuf>> {
    let out = dir.join("groups");
    ensure_dir(&out)?;
    let mut problems: BTreeMap<(String, i64), Vec<&RunRecord>> = BTreeMap::new();
    for record in records {
        problems
            .entry((record.system.clone(), record.instance))
            .or_default()
            .push(record);
    }
    let mut written = Vec::with_capacity(problems.len());
    for ((system, instance), runs) in &problems {
        let bytes = csv_bytes(
            &["algorithm", "time", "conf"],
            runs.iter().map(|r| {
                vec![r.algorithm.clone(), format_float(r.time), r.conf.to_string()]
            }),
        )?;
        let path = out.join(format!("{}-{}.csv", system, instance));
        atomic_write_bytes(&path, &bytes)?;
        written.push(path);
    }
    Ok(written)
}

/// Per-system heuristic comparison tables, `<system>_heuristic.csv`, with
/// time rounded to two decimals and rows ordered by instance then algorithm.
pub fn heuristic_tables(records: &[RunRecord], dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mut systems: BTreeMap<&str, Vec<&RunRecord>> = BTreeMap::new();
    for record in records {
        systems.entry(record.system.as_str()).or_default().push(record);
    }
    let mut written = Vec::with_capacity(systems.len());
    for (system, mut runs) in systems {
        runs.sort_by(|a, b| {
            a.instance
                .cmp(&b.instance)
                .then_with(|| a.algorithm.cmp(&b.algorithm))
        });
        let bytes = csv_bytes(
            &["algorithm", "system", "instance", "conf", "time", "makespan"],
            runs.iter().map(|r| {
                vec![
                    r.algorithm.clone(),
                    r.system.clone(),
                    r.instance.to_string(),
                    r.conf.to_string(),
                    format_float((r.time * 100.0).round() / 100.0),
                    r.makespan().to_string(),
                ]
            }),
        )?;
        let path = dir.join(format!("{}_heuristic.csv", system));
        atomic_write_bytes(&path, &bytes)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use schedlab_core::{scratch_dir, Outcome, MAKESPAN_EXHAUSTED};
    use std::fs;

    fn run(algorithm: &str, system: &str, instance: i64, time: f64, conf: i64, makespan: i64) -> RunRecord {
        RunRecord {
            algorithm: algorithm.to_string(),
            system: system.to_string(),
            instance,
            time,
            conf,
            outcome: Outcome::from_makespan(makespan),
            found_solution: makespan >= 0 && makespan != MAKESPAN_EXHAUSTED,
            error_text: None,
        }
    }

    fn headless() -> Reporter {
        Reporter::new(ChartOptions {
            render: false,
            ..ChartOptions::default()
        })
    }

    #[test]
    fn groups_are_alphabetical_and_sorted_ascending() {
        let records = vec![
            run("MinDelay", "S1", 1, 0.4, 30, 100),
            run("DFS", "S1", 1, 2.0, 90, 100),
            run("MinDelay", "S1", 2, 0.1, 10, 100),
            run("DFS", "S2", 1, f64::NAN, 50, 100),
        ];
        let groups = group_by_algorithm(&records, Metric::Conf);
        let labels: Vec<&str> = groups.iter().map(|(a, _)| a).collect();
        assert_eq!(labels, vec!["DFS", "MinDelay"]);
        assert_eq!(groups.get("DFS"), Some(&[50.0, 90.0][..]));
        assert_eq!(groups.get("MinDelay"), Some(&[10.0, 30.0][..]));

        let times = group_by_algorithm(&records, Metric::Time);
        let dfs = times.get("DFS").unwrap();
        assert_eq!(dfs[0], 2.0);
        assert!(dfs[1].is_nan(), "NaN sorts last");
    }

    #[test]
    fn metric_report_writes_csv_and_tex_and_returns_canvas() {
        let root = scratch_dir("metric_report");
        let records = vec![
            run("MinDelay", "S1", 1, 0.456, 30, 100),
            run("DFS", "S1", 1, 2.0, 90, 110),
            run("MinDelay", "S1", 2, 0.1, 10, 95),
        ];
        let (canvas, artifacts) = headless()
            .metric_report(Canvas::blank(), &records, Metric::Time, &root, "time")
            .expect("report");
        assert_eq!(artifacts.png, None);
        assert_eq!(canvas.series.len(), 2);
        assert_eq!(canvas.y_label, "Time (seconds)");

        let csv = fs::read_to_string(&artifacts.csv).expect("csv");
        assert_eq!(csv, "algorithm,time\nDFS,2.0\nMinDelay,0.1\nMinDelay,0.456\n");
        let tex = fs::read_to_string(&artifacts.tex).expect("tex");
        assert!(tex.contains("MinDelay & 0.46 \\\\"));
        assert!(tex.contains("DFS & 2.00 \\\\"));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn metric_report_discards_incoming_canvas_state() {
        let root = scratch_dir("metric_report_reset");
        let records = vec![run("DFS", "S1", 1, 1.0, 9, 100)];
        let reporter = headless();
        let (canvas, _) = reporter
            .metric_report(Canvas::blank(), &records, Metric::Conf, &root, "conf")
            .expect("first");
        let (canvas, _) = reporter
            .metric_report(canvas, &records, Metric::Makespan, &root, "makespan")
            .expect("second");
        assert_eq!(canvas.series.len(), 1);
        assert_eq!(canvas.y_label, "Make span");
        assert_eq!(canvas.series[0].points, vec![(0.0, 100.0)]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn integral_metrics_stay_integers() {
        let root = scratch_dir("metric_report_int");
        let records = vec![run("DFS", "S1", 1, 1.0, 9, 2_000)];
        let (_, artifacts) = headless()
            .metric_report(Canvas::blank(), &records, Metric::Makespan, &root, "makespan")
            .expect("report");
        assert_eq!(
            fs::read_to_string(&artifacts.csv).unwrap(),
            "algorithm,makespan\nDFS,2000\n"
        );
        assert!(fs::read_to_string(&artifacts.tex)
            .unwrap()
            .contains("DFS & 2000 \\\\"));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn style_exhaustion_aborts_the_report() {
        let root = scratch_dir("metric_report_styles");
        let records: Vec<RunRecord> = (0..120)
            .map(|i| run(&format!("alg{}", i), "S1", 1, 1.0, 1, 10))
            .collect();
        let err = headless()
            .metric_report(Canvas::blank(), &records, Metric::Time, &root, "time")
            .expect_err("too many groups");
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::StyleExhausted { requested: 120, .. })
        ));
        assert!(!root.join("time.csv").exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn unsolved_report_lists_distinct_problems() {
        let root = scratch_dir("unsolved_report");
        let records = vec![
            run("DFS", "S2", 4, 300.0, 100, MAKESPAN_EXHAUSTED),
            run("MinDelay", "S2", 4, 0.2, 3, -1),
            run("DFS", "S1", 9, 12.0, 40, -1),
        ];
        let (_, written) = headless()
            .unsolved_report(Canvas::blank(), &records, &root)
            .expect("report");
        assert!(written.contains(&root.join("no_solution.csv")));
        assert!(written.contains(&root.join("configurations.tex")));
        let problems = fs::read_to_string(root.join("problems_with_no_solutions.txt")).unwrap();
        assert_eq!(problems, "system,instance\nS2,4\nS1,9\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn instance_outputs_are_grouped_and_sorted() {
        let root = scratch_dir("instance_tables");
        let records = vec![
            run("MinDelay", "S2", 3, 0.123, 7, 50),
            run("DFS", "S1", 5, 1.0, 70, 40),
            run("DFS", "S2", 3, 2.5, 90, 45),
            run("MaxRemainingWorkSpan", "S1", 2, 0.987, 8, 44),
        ];
        let table = instance_table(&records, &root, "conf_instances").expect("table");
        let text = fs::read_to_string(table).unwrap();
        let systems: Vec<&str> = text.lines().skip(1).map(|l| &l[..5]).collect();
        assert_eq!(systems, vec!["S1,2,", "S1,5,", "S2,3,", "S2,3,"]);

        let groups = instance_groups(&records, &root).expect("groups");
        assert_eq!(groups.len(), 3);
        let s2 = fs::read_to_string(root.join("groups").join("S2-3.csv")).unwrap();
        assert_eq!(s2, "algorithm,time,conf\nMinDelay,0.123,7\nDFS,2.5,90\n");

        let tables = heuristic_tables(&records, &root).expect("heuristic tables");
        assert_eq!(tables.len(), 2);
        let s1 = fs::read_to_string(root.join("S1_heuristic.csv")).unwrap();
        assert_eq!(
            s1,
            "algorithm,system,instance,conf,time,makespan\n\
             MaxRemainingWorkSpan,S1,2,8,0.99,44\n\
             DFS,S1,5,70,1.0,40\n"
        );
        let _ = fs::remove_dir_all(root);
    }
}
