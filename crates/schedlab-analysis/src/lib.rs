//! Name normalization, partitioning and report generation over run records.

pub mod chart;
pub mod error;
pub mod latex;
pub mod names;
pub mod partition;
pub mod report;
pub mod style;

pub use chart::{Canvas, ChartOptions};
pub use error::ReportError;
pub use names::{normalize, NormalizeReport};
pub use partition::{solved, unsolved, Filter, Pattern, Predicate};
pub use report::{
    group_by_algorithm, heuristic_tables, instance_groups, instance_table, Metric, MetricGroups,
    ReportArtifacts, Reporter,
};
