use schedlab_core::{Outcome, RunRecord};

/// Case-insensitive substring pattern with `|`-separated literal
/// alternatives. No wildcard characters: `Cat*` only matches labels that
/// contain the literal text `cat*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    alternatives: Vec<String>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        Pattern {
            alternatives: pattern
                .split('|')
                .filter(|alt| !alt.is_empty())
                .map(str::to_lowercase)
                .collect(),
        }
    }

    pub fn any_of<S: AsRef<str>>(alternatives: &[S]) -> Self {
        Pattern {
            alternatives: alternatives
                .iter()
                .map(|a| a.as_ref())
                .filter(|alt| !alt.is_empty())
                .map(str::to_lowercase)
                .collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.alternatives.iter().any(|alt| text.contains(alt.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Solved,
    /// Exhausted search or errored run.
    Unsolved,
    AlgorithmContains(Pattern),
    AlgorithmLacks(Pattern),
    SystemContains(Pattern),
    SystemLacks(Pattern),
    TimeAtMost(f64),
}

impl Predicate {
    pub fn algorithm_contains(pattern: &str) -> Self {
        Predicate::AlgorithmContains(Pattern::new(pattern))
    }

    pub fn algorithm_lacks(pattern: &str) -> Self {
        Predicate::AlgorithmLacks(Pattern::new(pattern))
    }

    pub fn system_contains(pattern: &str) -> Self {
        Predicate::SystemContains(Pattern::new(pattern))
    }

    pub fn system_lacks(pattern: &str) -> Self {
        Predicate::SystemLacks(Pattern::new(pattern))
    }

    /// Keeps only `system` by excluding every other configured system.
    pub fn only_system<S: AsRef<str>>(system: &str, all_systems: &[S]) -> Self {
        let others: Vec<&str> = all_systems
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.eq_ignore_ascii_case(system))
            .collect();
        Predicate::SystemLacks(Pattern::any_of(&others))
    }

    pub fn matches(&self, record: &RunRecord) -> bool {
        match self {
            Predicate::Solved => record.outcome.is_solved(),
            Predicate::Unsolved => matches!(
                record.outcome,
                Outcome::Exhausted | Outcome::Errored(_)
            ),
            Predicate::AlgorithmContains(p) => p.matches(&record.algorithm),
            Predicate::AlgorithmLacks(p) => !p.matches(&record.algorithm),
            Predicate::SystemContains(p) => p.matches(&record.system),
            Predicate::SystemLacks(p) => !p.matches(&record.system),
            Predicate::TimeAtMost(limit) => record.time <= *limit,
        }
    }
}

/// Conjunction of predicates. An empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn matches(&self, record: &RunRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    pub fn apply(&self, records: &[RunRecord]) -> Vec<RunRecord> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

impl From<Predicate> for Filter {
    fn from(predicate: Predicate) -> Self {
        Filter::new().and(predicate)
    }
}

pub fn select(records: &[RunRecord], predicate: Predicate) -> Vec<RunRecord> {
    Filter::from(predicate).apply(records)
}

pub fn solved(records: &[RunRecord]) -> Vec<RunRecord> {
    select(records, Predicate::Solved)
}

pub fn unsolved(records: &[RunRecord]) -> Vec<RunRecord> {
    select(records, Predicate::Unsolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedlab_core::MAKESPAN_EXHAUSTED;

    fn run(algorithm: &str, system: &str, time: f64, makespan: i64) -> RunRecord {
        RunRecord {
            algorithm: algorithm.to_string(),
            system: system.to_string(),
            instance: 1,
            time,
            conf: 5,
            outcome: Outcome::from_makespan(makespan),
            found_solution: makespan >= 0 && makespan != MAKESPAN_EXHAUSTED,
            error_text: None,
        }
    }

    fn sample() -> Vec<RunRecord> {
        vec![
            run("DFS", "S1", 10.0, 120),
            run("CatDfs", "S2", 400.0, MAKESPAN_EXHAUSTED),
            run("RPT-T, E = 1.50", "S3", 20.0, 130),
            run("MinDelay", "S2", 0.5, -1),
            run("MaxRemainingWorkSpan", "S3", 1.5, 140),
            run("EstimatedSystemWorkspan", "S1", 2.0, -3),
        ]
    }

    #[test]
    fn exhausted_makespan_is_unsolved_not_solved() {
        let records = vec![run("DFS", "S1", 1.0, 2147483647)];
        assert!(solved(&records).is_empty());
        assert_eq!(unsolved(&records).len(), 1);
    }

    #[test]
    fn solved_and_unsolved_partition_the_input() {
        let records = sample();
        let ok = solved(&records);
        let bad = unsolved(&records);
        assert_eq!(ok.len() + bad.len(), records.len());
        for r in &records {
            let in_ok = ok.contains(r);
            let in_bad = bad.contains(r);
            assert!(in_ok ^ in_bad, "{} must be in exactly one side", r.algorithm);
        }
    }

    #[test]
    fn family_pattern_is_case_insensitive_substring() {
        let records = sample();
        let dfs = select(&records, Predicate::algorithm_contains("dfs|catdfs"));
        let names: Vec<&str> = dfs.iter().map(|r| r.algorithm.as_str()).collect();
        assert_eq!(names, vec!["DFS", "CatDfs"]);

        let with_e = select(&records, Predicate::algorithm_contains("E"));
        assert_eq!(with_e.len(), 4, "E matches any label containing an e");
    }

    #[test]
    fn asterisk_is_literal() {
        let records = vec![run("CatStar", "S1", 1.0, 10), run("Cat*Star", "S1", 1.0, 10)];
        let hits = select(&records, Predicate::algorithm_contains("Cat*"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].algorithm, "Cat*Star");
    }

    #[test]
    fn only_system_excludes_the_other_systems() {
        let systems = ["S1", "S2", "S3"];
        let records = sample();
        let s2 = select(&records, Predicate::only_system("S2", &systems));
        assert!(s2.iter().all(|r| r.system == "S2"));
        assert_eq!(s2.len(), 2);
    }

    #[test]
    fn system_exclusion_ignores_case() {
        let records = vec![
            run("DFS", "S1", 1.0, 10),
            run("DFS", "s1-rerun", 1.0, 10),
            run("DFS", "S2", 1.0, 10),
        ];
        let kept = select(&records, Predicate::system_lacks("S1"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].system, "S2");
    }

    #[test]
    fn filter_order_does_not_matter_and_input_is_untouched() {
        let records = sample();
        let snapshot = records.clone();
        let a = Filter::new()
            .and(Predicate::Solved)
            .and(Predicate::TimeAtMost(15.0))
            .and(Predicate::system_lacks("S3"))
            .apply(&records);
        let b = Filter::new()
            .and(Predicate::system_lacks("S3"))
            .and(Predicate::TimeAtMost(15.0))
            .and(Predicate::Solved)
            .apply(&records);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].algorithm, "DFS");
        assert_eq!(records, snapshot);
    }

    #[test]
    fn empty_pattern_matches_nothing() {
        let records = sample();
        assert!(select(&records, Predicate::algorithm_contains("")).is_empty());
        assert_eq!(
            select(&records, Predicate::algorithm_lacks("")).len(),
            records.len()
        );
    }
}
