use crate::error::RecordError;
use crate::atomic_write_bytes;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Makespan reported by a search that exhausted its space without a schedule.
pub const MAKESPAN_EXHAUSTED: i64 = 2_147_483_647;

pub const BASE_HEADER: [&str; 7] = [
    "algorithm",
    "system",
    "instance",
    "time",
    "conf",
    "makespan",
    "found_solution",
];

pub const EXTENDED_HEADER: [&str; 8] = [
    "algorithm",
    "system",
    "instance",
    "time",
    "conf",
    "makespan",
    "found_solution",
    "error_text",
];

/// Marker written in place of a missing error artifact.
pub const NO_ERROR_TEXT: &str = "None";

/// Result status of a run, decoded from the raw makespan integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Solved(i64),
    /// The search ran out of configurations without finding a schedule.
    Exhausted,
    /// Crash or error code (any negative makespan).
    Errored(i64),
}

impl Outcome {
    pub fn from_makespan(code: i64) -> Self {
        if code == MAKESPAN_EXHAUSTED {
            Outcome::Exhausted
        } else if code < 0 {
            Outcome::Errored(code)
        } else {
            Outcome::Solved(code)
        }
    }

    pub fn makespan_code(self) -> i64 {
        match self {
            Outcome::Solved(v) | Outcome::Errored(v) => v,
            Outcome::Exhausted => MAKESPAN_EXHAUSTED,
        }
    }

    pub fn is_solved(self) -> bool {
        matches!(self, Outcome::Solved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `algorithm;system;instance;time;conf;makespan;found_solution`
    Base,
    /// Base fields plus `error_text`.
    Extended,
}

impl Schema {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Schema::Base => &BASE_HEADER,
            Schema::Extended => &EXTENDED_HEADER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub algorithm: String,
    pub system: String,
    pub instance: i64,
    pub time: f64,
    pub conf: i64,
    pub outcome: Outcome,
    pub found_solution: bool,
    pub error_text: Option<String>,
}

impl RunRecord {
    /// Identity used for deduplication after name normalization.
    pub fn key(&self) -> (&str, &str, i64) {
        (&self.algorithm, &self.system, self.instance)
    }

    pub fn makespan(&self) -> i64 {
        self.outcome.makespan_code()
    }

    fn to_fields(&self, schema: Schema) -> Vec<String> {
        let mut fields = vec![
            self.algorithm.clone(),
            self.system.clone(),
            self.instance.to_string(),
            format_float(self.time),
            self.conf.to_string(),
            self.makespan().to_string(),
            if self.found_solution { "True" } else { "False" }.to_string(),
        ];
        if schema == Schema::Extended {
            fields.push(
                self.error_text
                    .clone()
                    .unwrap_or_else(|| NO_ERROR_TEXT.to_string()),
            );
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    pub algorithm: String,
    pub system: String,
    pub instance: String,
    pub time: String,
    pub conf: String,
    pub makespan: String,
    pub found_solution: String,
    #[serde(default)]
    pub error_text: Option<String>,
}

impl RawRecord {
    pub fn from_fields(fields: Vec<String>, schema: Schema) -> Result<Self, RecordError> {
        let expected = match schema {
            Schema::Base => "7",
            Schema::Extended => "7 or 8",
        };
        let accepted = match schema {
            Schema::Base => fields.len() == 7,
            Schema::Extended => fields.len() == 7 || fields.len() == 8,
        };
        if !accepted {
            return Err(RecordError::FieldCount {
                expected,
                found: fields.len(),
            });
        }
        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Ok(RawRecord {
            algorithm: next(),
            system: next(),
            instance: next(),
            time: next(),
            conf: next(),
            makespan: next(),
            found_solution: next(),
            error_text: {
                let text = next();
                if schema == Schema::Extended && !text.is_empty() {
                    Some(text)
                } else {
                    None
                }
            },
        })
    }

    pub fn conf_is_integer(&self) -> bool {
        !self.conf.is_empty() && self.conf.chars().all(|c| c.is_ascii_digit())
    }

    pub fn coerce(self) -> Result<RunRecord, RecordError> {
        let instance = parse_field::<i64>("instance", "integer", &self.instance)?;
        let time = parse_field::<f64>("time", "float", &self.time)?;
        let conf = parse_field::<i64>("conf", "integer", &self.conf)?;
        let makespan = parse_field::<i64>("makespan", "integer", &self.makespan)?;
        let found_solution = parse_bool(&self.found_solution)?;
        let error_text = self
            .error_text
            .filter(|t| !t.is_empty() && t != NO_ERROR_TEXT);
        Ok(RunRecord {
            algorithm: self.algorithm,
            system: self.system,
            instance,
            time,
            conf,
            outcome: Outcome::from_makespan(makespan),
            found_solution,
            error_text,
        })
    }
}

fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    kind: &'static str,
    value: &str,
) -> Result<T, RecordError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| RecordError::InvalidField {
            field,
            kind,
            value: value.to_string(),
        })
}

fn parse_bool(value: &str) -> Result<bool, RecordError> {
    match value.trim() {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" => Ok(false),
        _ => Err(RecordError::InvalidField {
            field: "found_solution",
            kind: "boolean",
            value: value.to_string(),
        }),
    }
}

/// Formats a float the way the merged CSV files carry them: integral
/// values keep a trailing `.0`.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// A raw row whose `conf` field is not a plain non-negative integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfFlag {
    pub row: usize,
    pub algorithm: String,
    pub system: String,
    pub instance: String,
    pub conf: String,
}

/// Reports rows with a suspicious `conf` value. The rows stay in the batch;
/// coercion decides whether they are usable.
pub fn flag_non_integer_conf(rows: &[RawRecord]) -> Vec<ConfFlag> {
    let flags: Vec<ConfFlag> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.conf_is_integer())
        .map(|(row, r)| ConfFlag {
            row,
            algorithm: r.algorithm.clone(),
            system: r.system.clone(),
            instance: r.instance.clone(),
            conf: r.conf.clone(),
        })
        .collect();
    for flag in &flags {
        warn!(
            row = flag.row,
            algorithm = %flag.algorithm,
            system = %flag.system,
            instance = %flag.instance,
            conf = %flag.conf,
            "conf is not a non-negative integer"
        );
    }
    flags
}

pub fn coerce_all(rows: Vec<RawRecord>) -> Result<Vec<RunRecord>, RecordError> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, raw)| raw.coerce().map_err(|e| e.at_row(idx)))
        .collect()
}

/// Reads a merged CSV (header-addressed, `error_text` optional) into raw rows.
pub fn read_raw_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<RawRecord>().enumerate() {
        let row = result.with_context(|| format!("{}: malformed row {}", path.display(), idx))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_records_csv(path: &Path) -> Result<(Vec<RunRecord>, Vec<ConfFlag>)> {
    let rows = read_raw_csv(path)?;
    let flags = flag_non_integer_conf(&rows);
    let records = coerce_all(rows).with_context(|| format!("failed to coerce {}", path.display()))?;
    Ok((records, flags))
}

pub fn records_to_csv(records: &[RunRecord], schema: Schema) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema.header())?;
    for record in records {
        writer.write_record(record.to_fields(schema))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush csv buffer: {}", e.error()))
}

pub fn write_records_csv(path: &Path, records: &[RunRecord], schema: Schema) -> Result<()> {
    let bytes = records_to_csv(records, schema)?;
    atomic_write_bytes(path, &bytes)
}
