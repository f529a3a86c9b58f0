//! Interfaces of the collaborators a form talks to.
//!
//! The form never owns any of these. The application registry and field
//! descriptors are passed in per call; the data source is held weakly (see
//! [`FormView::bind_data_source`](crate::FormView::bind_data_source)).

use crate::form::FormView;
use crate::tree::NodeTemplate;
use crate::Row;

/// Registration data shared by every view kind (`common()` in the builder).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewCommon {
    /// Unique view key, e.g. `"mobile-label"`.
    pub key: String,
    /// Icon name without the `fa-` prefix.
    pub icon: String,
    /// Multilingual label key.
    pub label_key: String,
}

impl ViewCommon {
    pub fn new(key: impl Into<String>, icon: impl Into<String>, label_key: impl Into<String>) -> Self {
        ViewCommon { key: key.into(), icon: icon.into(), label_key: label_key.into() }
    }
}

/// The application-wide view catalog.
pub trait Application {
    /// Every registered view kind, in registration order.
    fn view_all(&self) -> Vec<ViewCommon>;
}

/// One object-level constraint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

/// Outcome of [`DataSource::is_valid_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ValidationFailure { field: field.into(), message: message.into() });
    }

    /// True when no failure was recorded.
    pub fn pass(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }
}

/// The schema and validation authority behind a form.
pub trait DataSource {
    /// Check `row` against object-level constraints.
    fn is_valid_data(&self, row: &Row) -> ValidationResult;

    /// Row column holding the field `field_id`.
    ///
    /// `None` means the field id is used as the column name directly.
    fn column_name(&self, _field_id: &str) -> Option<String> {
        None
    }
}

/// A component kind that can be instantiated on a form.
pub trait ComponentKind {
    /// View key of the nodes this kind produces.
    fn key(&self) -> &str;

    /// Build a detached node for `form`. `None` means instantiation failed.
    fn new_instance(&self, app: &dyn Application, form: &FormView) -> Option<NodeTemplate>;
}

/// A data-object field that can be dropped onto a form.
pub trait DataField {
    fn id(&self) -> &str;

    /// Component kind used to edit this field, if any.
    fn form_component(&self) -> Option<&dyn ComponentKind>;
}
