use thiserror::Error;

/// Failure to turn raw text fields into a typed [`crate::RunRecord`].
///
/// Every variant is fatal for the batch being loaded; malformed `conf`
/// values are reported separately through [`crate::ConfFlag`] before
/// coercion is attempted.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: &'static str, found: usize },
    #[error("field `{field}` is not a valid {kind}: {value:?}")]
    InvalidField {
        field: &'static str,
        kind: &'static str,
        value: String,
    },
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<RecordError>,
    },
}

impl RecordError {
    pub(crate) fn at_row(self, row: usize) -> Self {
        RecordError::Row {
            row,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping row wrappers.
    pub fn root(&self) -> &RecordError {
        match self {
            RecordError::Row { source, .. } => source.root(),
            other => other,
        }
    }
}
