//! Settings normalization.
//!
//! Form settings arrive from persistence in whatever shape the editor last
//! wrote them: booleans as `"true"`, widths as `"120"`, missing keys, `null`s.
//! [`FormSettings::normalize`] turns that map into a typed record and writes
//! the coerced values back into the map, so a second pass is a no-op.
//!
//! ```text
//! raw map ──▶ per-key coercion ──▶ FormSettings ──▶ to_values() ──▶ raw map
//!               (defaults for                         (typed JSON)
//!                absent / null)
//! ```
//!
//! Coercion rules per key:
//!
//! - `labelPosition`: absent, `null` or `""` become `"left"`; any other
//!   value passes through.
//! - `showLabel` / `clearOnLoad` / `clearOnSave`: JSON booleans or their
//!   textual form; anything else is [`FormError::MalformedSetting`].
//! - `labelWidth` / `height`: integer-prefix parsing of strings, truncation
//!   of numbers. No leading digits, or a negative result, is malformed.
//! - `dataviewID` / `editForm`: pass through untouched, defaults when absent.
//! - rule lists: pass through; a string holding a JSON array is decoded,
//!   any other string is kept as is. Only arrays feed the rule engines.

use crate::error::{FormError, Result};
use once_cell::sync::Lazy;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

pub(crate) const DEFAULT_LABEL_POSITION: &str = "left";
pub(crate) const DEFAULT_LABEL_WIDTH: u32 = 120;
pub(crate) const DEFAULT_HEIGHT: u32 = 200;
pub(crate) const DEFAULT_EDIT_FORM: &str = "none";

static DEFAULT_VALUES: Lazy<Map<String, Value>> = Lazy::new(|| {
    let defaults = json!({
        "dataviewID": null,
        "showLabel": true,
        "labelPosition": DEFAULT_LABEL_POSITION,
        "labelWidth": DEFAULT_LABEL_WIDTH,
        "height": DEFAULT_HEIGHT,
        "clearOnLoad": false,
        "clearOnSave": false,
        "displayRules": [],
        "editForm": DEFAULT_EDIT_FORM,
        "recordRules": [],
        "submitRules": [],
    });
    defaults.as_object().cloned().unwrap_or_default()
});

/// Persisted defaults for every form setting.
pub fn default_values() -> &'static Map<String, Value> {
    &DEFAULT_VALUES
}

/// Typed form configuration.
///
/// Keys the form only stores (pointers, rule lists) stay as JSON so a value
/// the editor wrote in an unexpected shape survives a load/save cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSettings {
    /// Data collection the form is bound to, `null` when unset.
    pub dataview_id: Value,
    pub show_label: bool,
    pub label_position: Value,
    pub label_width: u32,
    pub height: u32,
    pub clear_on_load: bool,
    pub clear_on_save: bool,
    pub display_rules: Value,
    /// Pointer to the form used for editing, `"none"` when unset.
    pub edit_form: Value,
    /// Raw record rule definitions; compiled on every rule session.
    pub record_rules: Value,
    /// Raw submit rule definitions; compiled on every rule session.
    pub submit_rules: Value,
}

impl Default for FormSettings {
    fn default() -> Self {
        FormSettings {
            dataview_id: Value::Null,
            show_label: true,
            label_position: Value::from(DEFAULT_LABEL_POSITION),
            label_width: DEFAULT_LABEL_WIDTH,
            height: DEFAULT_HEIGHT,
            clear_on_load: false,
            clear_on_save: false,
            display_rules: Value::Array(Vec::new()),
            edit_form: Value::from(DEFAULT_EDIT_FORM),
            record_rules: Value::Array(Vec::new()),
            submit_rules: Value::Array(Vec::new()),
        }
    }
}

impl FormSettings {
    /// Coerce `values` in place and return the typed settings.
    ///
    /// Keys this form does not know about are left untouched.
    pub fn normalize(values: &mut Map<String, Value>) -> Result<Self> {
        let settings = FormSettings {
            dataview_id: passthrough(values, "dataviewID", Value::Null),
            show_label: parse_bool(values, "showLabel", true)?,
            label_position: label_position(values),
            label_width: parse_int(values, "labelWidth", DEFAULT_LABEL_WIDTH)?,
            height: parse_int(values, "height", DEFAULT_HEIGHT)?,
            clear_on_load: parse_bool(values, "clearOnLoad", false)?,
            clear_on_save: parse_bool(values, "clearOnSave", false)?,
            display_rules: list(values, "displayRules"),
            edit_form: passthrough(values, "editForm", Value::from(DEFAULT_EDIT_FORM)),
            record_rules: list(values, "recordRules"),
            submit_rules: list(values, "submitRules"),
        };

        values.extend(settings.to_values());
        debug!(
            label_width = settings.label_width,
            height = settings.height,
            record_rules = settings.record_rule_defs().len(),
            submit_rules = settings.submit_rule_defs().len(),
            "normalized form settings"
        );
        Ok(settings)
    }

    /// Record rule definitions, empty unless `recordRules` is an array.
    pub fn record_rule_defs(&self) -> &[Value] {
        rule_defs(&self.record_rules)
    }

    /// Submit rule definitions, empty unless `submitRules` is an array.
    pub fn submit_rule_defs(&self) -> &[Value] {
        rule_defs(&self.submit_rules)
    }

    /// The persisted shape of these settings.
    pub fn to_values(&self) -> Map<String, Value> {
        let values = json!({
            "dataviewID": self.dataview_id,
            "showLabel": self.show_label,
            "labelPosition": self.label_position,
            "labelWidth": self.label_width,
            "height": self.height,
            "clearOnLoad": self.clear_on_load,
            "clearOnSave": self.clear_on_save,
            "displayRules": self.display_rules,
            "editForm": self.edit_form,
            "recordRules": self.record_rules,
            "submitRules": self.submit_rules,
        });
        values.as_object().cloned().unwrap_or_default()
    }
}

fn rule_defs(list: &Value) -> &[Value] {
    list.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// `None` for absent and `null` entries.
fn present<'v>(values: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    values.get(key).filter(|v| !v.is_null())
}

fn malformed(key: &'static str, value: &Value) -> FormError {
    FormError::MalformedSetting { key, value: value.to_string() }
}

fn parse_bool(values: &Map<String, Value>, key: &'static str, default: bool) -> Result<bool> {
    match present(values, key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(v @ Value::String(s)) => match s.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(malformed(key, v)),
        },
        Some(v) => Err(malformed(key, v)),
    }
}

/// Integer coercion with `parseInt`-style prefix parsing for strings.
fn parse_int(values: &Map<String, Value>, key: &'static str, default: u32) -> Result<u32> {
    let Some(value) = present(values, key) else {
        return Ok(default);
    };

    let parsed: Option<i64> = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            regex!(r"^\s*([+-]?\d+)").captures(s).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse().ok())
        }
        _ => None,
    };

    parsed.and_then(|n| u32::try_from(n).ok()).ok_or_else(|| malformed(key, value))
}

fn label_position(values: &Map<String, Value>) -> Value {
    match present(values, "labelPosition") {
        None => Value::from(DEFAULT_LABEL_POSITION),
        Some(Value::String(s)) if s.is_empty() => Value::from(DEFAULT_LABEL_POSITION),
        Some(v) => v.clone(),
    }
}

fn passthrough(values: &Map<String, Value>, key: &str, default: Value) -> Value {
    present(values, key).cloned().unwrap_or(default)
}

/// Lists pass through; a string holding a JSON array is decoded first.
fn list(values: &Map<String, Value>, key: &str) -> Value {
    let Some(value) = present(values, key) else {
        return Value::Array(Vec::new());
    };

    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded @ Value::Array(_)) => decoded,
            _ => value.clone(),
        },
        Value::Array(_) => value.clone(),
        other => {
            warn!(key, value = %other, "rule list is not an array; keeping it as stored");
            other.clone()
        }
    }
}
