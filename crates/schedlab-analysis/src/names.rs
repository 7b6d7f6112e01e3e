//! Algorithm-name normalization.
//!
//! Experiment generations encoded the exploration factor of the `Cat-DFS`
//! searches differently (`Cat-DFS-175-RPT-T` vs `Cat-DFS-1.75-RPT-T`). The
//! rewrite runs per family in two phases: legacy integer codes are collapsed
//! to the decimal intermediate form, then the intermediate form is relabelled
//! to the display name. Each family ends with a last-write-wins dedup on
//! (algorithm, system, instance) so reruns under both encodings collapse to
//! the newest row.

use schedlab_core::RunRecord;
use std::collections::HashSet;
use tracing::debug;

/// Families whose `Cat-DFS-<factor>-<family>` names get relabelled, in the
/// order they are processed.
pub const FAMILIES: [&str; 2] = ["RPT-T", "MRPT-T"];

/// Legacy integer encoding of the exploration factor (factor * 100).
const LEGACY_CODES: [(&str, &str); 13] = [
    ("100", "1"),
    ("125", "1.25"),
    ("150", "1.5"),
    ("175", "1.75"),
    ("200", "2"),
    ("225", "2.25"),
    ("250", "2.5"),
    ("275", "2.75"),
    ("300", "3"),
    ("350", "3.5"),
    ("400", "4"),
    ("450", "4.5"),
    ("500", "5"),
];

/// Intermediate factor spelling and its two-decimal display form.
const FACTORS: [(&str, &str); 15] = [
    ("1", "1.00"),
    ("1.25", "1.25"),
    ("1.5", "1.50"),
    ("1.75", "1.75"),
    ("2", "2.00"),
    ("2.25", "2.25"),
    ("2.5", "2.50"),
    ("2.75", "2.75"),
    ("3", "3.00"),
    ("3.25", "3.25"),
    ("3.5", "3.50"),
    ("3.75", "3.75"),
    ("4", "4.00"),
    ("4.5", "4.50"),
    ("5", "5.00"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    pub from: String,
    pub to: String,
}

impl RenameRule {
    fn new(from: String, to: String) -> Self {
        RenameRule { from, to }
    }
}

#[derive(Debug, Clone)]
pub struct FamilyRules {
    pub family: &'static str,
    pub legacy: Vec<RenameRule>,
    pub display: Vec<RenameRule>,
}

impl FamilyRules {
    pub fn for_family(family: &'static str) -> Self {
        let legacy = LEGACY_CODES
            .iter()
            .map(|(code, factor)| {
                RenameRule::new(
                    format!("Cat-DFS-{}-{}", code, family),
                    format!("Cat-DFS-{}-{}", factor, family),
                )
            })
            .collect();
        let display = FACTORS
            .iter()
            .map(|(factor, shown)| {
                RenameRule::new(
                    format!("Cat-DFS-{}-{}", factor, family),
                    format!("{}, E = {}", family, shown),
                )
            })
            .collect();
        FamilyRules {
            family,
            legacy,
            display,
        }
    }
}

pub fn rename_table() -> Vec<FamilyRules> {
    FAMILIES.iter().copied().map(FamilyRules::for_family).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub renamed: usize,
    pub dropped_duplicates: usize,
}

/// Applies `rules` in order, each as an exact match over every record.
/// Returns the number of rewrites performed.
pub fn apply_rules(records: &mut [RunRecord], rules: &[RenameRule]) -> usize {
    let mut rewrites = 0;
    for rule in rules {
        for record in records.iter_mut().filter(|r| r.algorithm == rule.from) {
            record.algorithm.clone_from(&rule.to);
            rewrites += 1;
        }
    }
    rewrites
}

/// Drops all but the last occurrence of each (algorithm, system, instance).
/// Survivors keep their relative order.
pub fn dedup_keep_last(records: &mut Vec<RunRecord>) -> usize {
    let mut seen: HashSet<(String, String, i64)> = HashSet::new();
    let mut keep = vec![false; records.len()];
    for (idx, record) in records.iter().enumerate().rev() {
        let (algorithm, system, instance) = record.key();
        keep[idx] = seen.insert((algorithm.to_string(), system.to_string(), instance));
    }
    let before = records.len();
    let mut flags = keep.into_iter();
    records.retain(|_| flags.next().unwrap_or(true));
    before - records.len()
}

pub fn normalize_with(records: &mut Vec<RunRecord>, table: &[FamilyRules]) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for rules in table {
        let legacy = apply_rules(records, &rules.legacy);
        let relabelled = apply_rules(records, &rules.display);
        let dropped = dedup_keep_last(records);
        debug!(
            family = rules.family,
            legacy,
            display = relabelled,
            dropped,
            "normalized algorithm names"
        );
        report.renamed += legacy + relabelled;
        report.dropped_duplicates += dropped;
    }
    report
}

pub fn normalize(records: &mut Vec<RunRecord>) -> NormalizeReport {
    normalize_with(records, &rename_table())
}
