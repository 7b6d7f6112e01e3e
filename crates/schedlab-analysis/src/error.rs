use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// More algorithm groups than unique (line, marker) pairs.
    #[error(
        "requested {requested} series styles but only {available} unique line/marker combinations exist"
    )]
    StyleExhausted { requested: usize, available: usize },
    #[error("chart rendering failed: {0}")]
    Render(String),
}
