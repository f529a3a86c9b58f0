use crate::Row;
use crate::collab::ValidationFailure;
use thiserror::Error;

/// Errors surfaced by a [`FormView`](crate::FormView).
///
/// Authoring mistakes (a field without a component, a malformed rule
/// definition) are not errors: they are skipped and logged instead.
#[derive(Error, Debug)]
pub enum FormError {
    /// A persisted setting could not be coerced to its declared type.
    #[error("malformed setting `{key}`: {value}")]
    MalformedSetting { key: &'static str, value: String },

    /// The bound data source rejected the row. `row` is the row exactly as
    /// it was handed in.
    #[error("updated data is invalid ({} failure(s))", failures.len())]
    Validation { row: Row, failures: Vec<ValidationFailure> },

    /// Validation was required but the form has no live data source.
    #[error("no data source is bound to this form")]
    MissingDataSource,
}

pub type Result<T> = std::result::Result<T, FormError>;
