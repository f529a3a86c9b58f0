//! Stock field descriptors and the field-type -> component table.
//!
//! Hosts with their own data layer implement [`DataField`] / [`DataSource`]
//! directly. [`SimpleField`] and [`SimpleObject`] cover the common case of a
//! flat object definition and are what the tests drive the form with.

use crate::collab::{Application, ComponentKind, DataField, DataSource, ValidationResult};
use crate::engine::{as_number, is_empty_value, parse_datetime};
use crate::form::FormView;
use crate::tree::{Capabilities, NodeTemplate};
use crate::Row;
use once_cell::sync::Lazy;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::debug;

/// Data-object field types known to the stock descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    LongText,
    Number,
    Boolean,
    Date,
    DateTime,
    List,
    Email,
    Image,
    /// Auto-incrementing id; never edited on a form.
    AutoIndex,
    /// Computed value; never edited on a form.
    Formula,
}

impl FieldType {
    /// Persisted field key, e.g. `"LongText"`.
    pub fn key(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::LongText => "LongText",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::List => "list",
            FieldType::Email => "email",
            FieldType::Image => "image",
            FieldType::AutoIndex => "AutoIndex",
            FieldType::Formula => "formula",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        const ALL: [FieldType; 11] = [
            FieldType::String,
            FieldType::LongText,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Date,
            FieldType::DateTime,
            FieldType::List,
            FieldType::Email,
            FieldType::Image,
            FieldType::AutoIndex,
            FieldType::Formula,
        ];
        ALL.into_iter().find(|t| t.key() == key)
    }
}

/// A form item kind from the stock catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardComponent {
    key: &'static str,
    defaults: Map<String, Value>,
}

impl StandardComponent {
    fn new(key: &'static str, defaults: Value) -> Self {
        StandardComponent { key, defaults: defaults.as_object().cloned().unwrap_or_default() }
    }

    /// Stock component used to edit fields of `field_type`.
    pub fn for_field_type(field_type: FieldType) -> Option<&'static StandardComponent> {
        STANDARD_COMPONENTS.get(&field_type)
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }
}

/// Field type -> form item kind. Types without an entry cannot be dropped on a form.
static STANDARD_COMPONENTS: Lazy<HashMap<FieldType, StandardComponent>> = Lazy::new(|| {
    HashMap::from([
        (FieldType::String, StandardComponent::new("mobile-textbox", json!({ "type": "single" }))),
        (FieldType::LongText, StandardComponent::new("mobile-textbox", json!({ "type": "multiple" }))),
        (FieldType::Number, StandardComponent::new("mobile-number", json!({}))),
        (FieldType::Boolean, StandardComponent::new("mobile-checkbox", json!({}))),
        (FieldType::Date, StandardComponent::new("mobile-date", json!({ "timepicker": false }))),
        (FieldType::DateTime, StandardComponent::new("mobile-date", json!({ "timepicker": true }))),
        (FieldType::List, StandardComponent::new("mobile-selectsingle", json!({ "type": "richselect" }))),
        (FieldType::Email, StandardComponent::new("mobile-email", json!({}))),
        (FieldType::Image, StandardComponent::new("mobile-image", json!({}))),
    ])
});

impl ComponentKind for StandardComponent {
    fn key(&self) -> &str {
        self.key
    }

    /// Fails when the application never registered this view kind.
    fn new_instance(&self, app: &dyn Application, _form: &FormView) -> Option<NodeTemplate> {
        if !app.view_all().iter().any(|view| view.key == self.key) {
            debug!(kind = self.key, "component kind is not registered with the application");
            return None;
        }

        Some(NodeTemplate { settings: self.defaults.clone(), ..NodeTemplate::new(self.key, Capabilities::FIELD_BINDABLE) })
    }
}

/// A plain data-object field.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleField {
    pub id: String,
    pub column_name: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl SimpleField {
    pub fn new(id: impl Into<String>, column_name: impl Into<String>, field_type: FieldType) -> Self {
        SimpleField { id: id.into(), column_name: column_name.into(), field_type, required: false }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Type-level check of a present value; `None` when it fits.
    fn type_error(&self, value: &Value) -> Option<&'static str> {
        let fits = match self.field_type {
            FieldType::Number => as_number(value).is_some(),
            FieldType::Boolean => matches!(value, Value::Bool(_)),
            FieldType::Date | FieldType::DateTime => parse_datetime(value).is_some(),
            FieldType::Email => value.as_str().is_some_and(|s| regex!(r"^[^@\s]+@[^@\s]+$").is_match(s)),
            _ => true,
        };
        (!fits).then_some(match self.field_type {
            FieldType::Number => "must be a number",
            FieldType::Boolean => "must be true or false",
            FieldType::Date | FieldType::DateTime => "must be a date",
            FieldType::Email => "must be an email address",
            _ => "has an invalid value",
        })
    }
}

impl DataField for SimpleField {
    fn id(&self) -> &str {
        &self.id
    }

    fn form_component(&self) -> Option<&dyn ComponentKind> {
        StandardComponent::for_field_type(self.field_type).map(|c| c as &dyn ComponentKind)
    }
}

/// A flat data object: a list of fields plus their constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleObject {
    pub fields: Vec<SimpleField>,
}

impl SimpleObject {
    pub fn new(fields: Vec<SimpleField>) -> Self {
        SimpleObject { fields }
    }

    pub fn field(&self, field_id: &str) -> Option<&SimpleField> {
        self.fields.iter().find(|f| f.id == field_id)
    }
}

impl DataSource for SimpleObject {
    fn is_valid_data(&self, row: &Row) -> ValidationResult {
        let mut result = ValidationResult::new();

        for field in &self.fields {
            match row.get(&field.column_name) {
                None => {
                    if field.required {
                        result.add_error(&field.column_name, "is required");
                    }
                }
                Some(value) if is_empty_value(value) => {
                    if field.required {
                        result.add_error(&field.column_name, "is required");
                    }
                }
                Some(value) => {
                    if let Some(message) = field.type_error(value) {
                        result.add_error(&field.column_name, message);
                    }
                }
            }
        }

        result
    }

    fn column_name(&self, field_id: &str) -> Option<String> {
        self.field(field_id).map(|f| f.column_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> SimpleObject {
        SimpleObject::new(vec![
            SimpleField::new("f-name", "name", FieldType::String).required(),
            SimpleField::new("f-age", "age", FieldType::Number),
            SimpleField::new("f-mail", "email", FieldType::Email),
            SimpleField::new("f-born", "born", FieldType::Date),
        ])
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn valid_row_passes() {
        let result = object().is_valid_data(&row(json!({
            "name": "Ada",
            "age": "36",
            "email": "ada@example.com",
            "born": "1815-12-10",
        })));
        assert!(result.pass(), "{:?}", result.failures());
    }

    #[test]
    fn each_failure_is_reported() {
        let result = object().is_valid_data(&row(json!({
            "name": "",
            "age": "old",
            "email": "nope",
            "born": "someday",
        })));
        let fields: Vec<&str> = result.failures().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "age", "email", "born"]);
    }

    #[test]
    fn column_names_come_from_fields() {
        assert_eq!(object().column_name("f-age").as_deref(), Some("age"));
        assert_eq!(object().column_name("missing"), None);
    }

    #[test]
    fn computed_fields_have_no_component() {
        assert!(SimpleField::new("id", "id", FieldType::AutoIndex).form_component().is_none());
        assert_eq!(SimpleField::new("n", "n", FieldType::LongText).form_component().map(|c| c.key()), Some("mobile-textbox"));
        assert_eq!(FieldType::from_key("LongText"), Some(FieldType::LongText));
    }
}
