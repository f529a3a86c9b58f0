//! Field resolution.
//!
//! Rules address fields by data-object field id, while rows are keyed by
//! column name. `FieldLookup` bridges the two through the bound data source:
//!
//! ```text
//! condition.field_id ──▶ DataSource::column_name ──┬─ Some(col) -> row[col]
//!                                                  └─ None      -> row[field_id]
//! ```
//!
//! Without a data source every field id is its own column.

use crate::Row;
use crate::collab::DataSource;
use serde_json::Value;
use std::borrow::Cow;

#[derive(Clone, Copy)]
pub(crate) struct FieldLookup<'a> {
    source: Option<&'a dyn DataSource>,
}

impl<'a> FieldLookup<'a> {
    pub(crate) fn new(source: Option<&'a dyn DataSource>) -> Self {
        FieldLookup { source }
    }

    pub(crate) fn column<'f>(&self, field_id: &'f str) -> Cow<'f, str> {
        match self.source.and_then(|s| s.column_name(field_id)) {
            Some(column) => Cow::Owned(column),
            None => Cow::Borrowed(field_id),
        }
    }

    pub(crate) fn get<'r>(&self, row: &'r Row, field_id: &str) -> Option<&'r Value> {
        row.get(&*self.column(field_id))
    }

    pub(crate) fn set(&self, row: &mut Row, field_id: &str, value: Value) {
        row.insert(self.column(field_id).into_owned(), value);
    }
}
