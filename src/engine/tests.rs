use super::*;
use crate::collab::{DataSource, ValidationResult};
use crate::form::FormView;
use crate::tree::{Capabilities, NodeTemplate};
use crate::{RedirectKind, Row, SubmitEffect};
use serde_json::{Map, Value, json};
use std::rc::Rc;

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn defs(value: Value) -> Vec<Value> {
    value.as_array().cloned().unwrap()
}

fn record_engine(rules: Value) -> RecordRules<'static> {
    let mut engine = RecordRules::new();
    engine.load_settings(&defs(rules));
    engine
}

fn submit_engine(rules: Value) -> SubmitRules<'static> {
    let mut engine = SubmitRules::new();
    engine.load_settings(&defs(rules));
    engine
}

/// Maps field ids `fld-<name>` to column `<name>`; accepts everything.
struct PrefixedColumns;

impl DataSource for PrefixedColumns {
    fn is_valid_data(&self, _row: &Row) -> ValidationResult {
        ValidationResult::new()
    }

    fn column_name(&self, field_id: &str) -> Option<String> {
        field_id.strip_prefix("fld-").map(str::to_string)
    }
}

#[test]
fn comparer_examples() {
    // (comparer, actual, expected, result)
    let cases: Vec<(&str, Option<Value>, Value, bool)> = vec![
        ("=", Some(json!("x")), json!("x"), true),
        ("=", Some(json!("x")), json!("y"), false),
        ("equals", Some(json!(1)), json!("1"), true),
        ("==", Some(json!("2.0")), json!(2), true),
        ("=", Some(json!(true)), json!("true"), true),
        ("=", None, json!(""), true),
        ("=", None, json!("x"), false),
        ("!=", None, json!("x"), true),
        ("<>", Some(json!("a")), json!("a"), false),
        ("<", Some(json!("9")), json!(10), true),
        ("less", Some(json!("b")), json!("a"), false),
        ("<=", Some(json!(10)), json!("10"), true),
        (">", Some(json!(3.5)), json!(3), true),
        (">", None, json!(3), false),
        (">=", Some(json!("2024-01-02")), json!("2024-01-02"), true),
        ("contains", Some(json!("Hello World")), json!("world"), true),
        ("contains", Some(json!(["a", "b"])), json!("b"), true),
        ("not_contains", Some(json!("Hello")), json!("xyz"), true),
        ("not_contains", None, json!("xyz"), true),
        ("not_contains", Some(json!(["a", "b"])), json!("a"), false),
        ("begins_with", Some(json!("Rustacean")), json!("rust"), true),
        ("ends_with", Some(json!("Rustacean")), json!("ocean"), false),
        ("is_empty", Some(json!("  ")), json!(null), true),
        ("is_empty", None, json!(null), true),
        ("is_not_empty", Some(json!(0)), json!(null), true),
        ("before", Some(json!("2024-01-01")), json!("2024-01-01T10:00:00Z"), true),
        ("after", Some(json!("2024-03-01 08:00:00")), json!("2024-02-29"), true),
        ("on", Some(json!("2024-03-01 23:59:00")), json!("2024-03-01"), true),
        ("after", Some(json!("not a date")), json!("2024-02-29"), false),
    ];

    for (comparer, actual, expected, result) in cases {
        let parsed = Comparer::parse(comparer).unwrap();
        assert_eq!(
            parsed.evaluate(actual.as_ref(), &expected, None),
            result,
            "{actual:?} {comparer} {expected}"
        );
    }
}

#[test]
fn unknown_comparer_is_rejected() {
    assert_eq!(Comparer::parse("roughly"), None);
    assert_eq!(Comparer::parse(" Is_Empty "), Some(Comparer::IsEmpty));
}

#[test]
fn later_rules_see_earlier_writes() {
    let engine = record_engine(json!([
        { "when": [], "values": [{ "fieldId": "A", "value": 1 }] },
        { "when": [{ "fieldId": "A", "comparer": "=", "value": 1 }], "values": [{ "fieldId": "B", "value": 2 }] },
    ]));

    assert_eq!(engine.process(&Row::new()), row(json!({ "A": 1, "B": 2 })));
}

#[test]
fn rules_apply_in_declaration_order() {
    let engine = record_engine(json!([
        { "when": [], "values": [{ "fieldId": "status", "value": "first" }] },
        { "when": [{ "fieldId": "status", "comparer": "=", "value": "first" }],
          "values": [{ "fieldId": "status", "value": "second" }] },
        { "when": [{ "fieldId": "status", "comparer": "=", "value": "first" }],
          "values": [{ "fieldId": "status", "value": "never" }] },
    ]));

    let result = engine.run_with_report(Phase::Process, &Row::new());
    assert_eq!(result.data, row(json!({ "status": "second" })));
    assert_eq!(result.report.fired, vec![0, 1]);
}

#[test]
fn input_row_is_not_mutated() {
    let engine = record_engine(json!([{ "when": [], "values": [{ "fieldId": "f", "value": "new" }] }]));
    let input = row(json!({ "f": "old" }));

    let output = engine.process_pre(&input);
    assert_eq!(input, row(json!({ "f": "old" })));
    assert_eq!(output, row(json!({ "f": "new" })));
}

#[test]
fn fill_only_writes_empty_fields() {
    let engine = record_engine(json!([{
        "action": "fill",
        "when": [],
        "values": [{ "fieldId": "country", "value": "CH" }, { "fieldId": "city", "value": "Bern" }],
    }]));

    let output = engine.process_pre(&row(json!({ "country": "", "city": "Basel" })));
    assert_eq!(output, row(json!({ "country": "CH", "city": "Basel" })));
}

#[test]
fn clear_nulls_fields() {
    let engine = record_engine(json!([{
        "action": "clear",
        "when": [{ "fieldId": "kind", "comparer": "!=", "value": "company" }],
        "values": [{ "fieldId": "vat" }],
    }]));

    assert_eq!(engine.process(&row(json!({ "kind": "person", "vat": "X1" }))), row(json!({ "kind": "person", "vat": null })));
    assert_eq!(engine.process(&row(json!({ "kind": "company", "vat": "X1" }))), row(json!({ "kind": "company", "vat": "X1" })));
}

#[test]
fn all_conditions_must_hold() {
    let engine = record_engine(json!([{
        "when": [
            { "fieldId": "age", "comparer": ">=", "value": 18 },
            { "fieldId": "country", "comparer": "=", "value": "CH" },
        ],
        "values": [{ "fieldId": "adult", "value": true }],
    }]));

    assert_eq!(engine.process(&row(json!({ "age": "20", "country": "CH" })))["adult"], json!(true));
    assert!(!engine.process(&row(json!({ "age": "20", "country": "DE" }))).contains_key("adult"));
}

#[test]
fn malformed_definitions_are_skipped_with_stable_ids() {
    let engine = record_engine(json!([
        { "when": [{ "fieldId": "a", "comparer": "~~", "value": 1 }], "values": [] },
        "not a rule",
        { "action": "explode", "when": [], "values": [] },
        { "when": [{ "fieldId": "a", "comparer": "matches", "value": "(" }], "values": [] },
        { "when": [], "values": [{ "fieldId": "ok", "value": true }] },
    ]));

    let result = engine.run_with_report(Phase::Pre, &Row::new());
    let skipped: Vec<RuleId> = result.report.skipped.iter().map(|s| s.id).collect();
    assert_eq!(skipped, vec![0, 1, 2, 3]);
    assert_eq!(result.report.fired, vec![4]);
    assert_eq!(result.data, row(json!({ "ok": true })));
}

#[test]
fn matches_uses_compiled_pattern() {
    let engine = record_engine(json!([{
        "when": [{ "fieldId": "zip", "comparer": "matches", "value": "^\\d{4}$" }],
        "values": [{ "fieldId": "zipValid", "value": true }],
    }]));

    assert_eq!(engine.process(&row(json!({ "zip": "3011" })))["zipValid"], json!(true));
    assert!(!engine.process(&row(json!({ "zip": "30110" }))).contains_key("zipValid"));
}

#[test]
fn data_source_maps_fields_to_columns() {
    let source: Rc<dyn DataSource> = Rc::new(PrefixedColumns);
    let mut engine = record_engine(json!([{
        "when": [{ "fieldId": "fld-first", "comparer": "is_not_empty" }],
        "values": [{ "fieldId": "fld-greeting", "value": "hi" }, { "fieldId": "raw", "value": 1 }],
    }]));
    engine.object_load(Some(source));

    let output = engine.process(&row(json!({ "first": "Ada" })));
    assert_eq!(output, row(json!({ "first": "Ada", "greeting": "hi", "raw": 1 })));
}

#[test]
fn report_lists_nodes_bound_to_touched_fields() {
    let mut form = FormView::from_values("form-1", Map::new()).unwrap();
    let field = |id: &str| NodeTemplate {
        field_id: Some(id.to_string()),
        ..NodeTemplate::new("mobile-textbox", Capabilities::FIELD_BINDABLE)
    };
    let layout = form.tree_mut().insert(None, NodeTemplate::new("mobile-layout", Capabilities::CONTAINER)).unwrap();
    let total = form.tree_mut().insert(Some(layout), field("total")).unwrap();
    form.tree_mut().insert(None, field("note")).unwrap();

    let mut engine = record_engine(json!([{ "when": [], "values": [{ "fieldId": "total", "value": 0 }] }]));
    engine.form_load(&form);

    let report = engine.run_with_report(Phase::Pre, &Row::new()).report;
    assert_eq!(report.touched_fields, vec!["total".to_string()]);
    assert_eq!(report.touched_nodes, vec![total]);
}

#[test]
fn submit_update_merges_object() {
    let engine = submit_engine(json!([{
        "when": [{ "fieldId": "status", "comparer": "=", "value": "draft" }],
        "value": { "status": "submitted", "locked": true },
    }]));

    assert_eq!(
        engine.process(&row(json!({ "status": "draft", "title": "t" }))),
        row(json!({ "status": "submitted", "locked": true, "title": "t" }))
    );
    assert_eq!(engine.process(&row(json!({ "status": "final" }))), row(json!({ "status": "final" })));
}

#[test]
fn submit_effects_are_collected_in_order() {
    let engine = submit_engine(json!([
        { "action": "message", "when": [], "value": "Thanks!" },
        { "action": "website", "when": [{ "fieldId": "vip", "comparer": "=", "value": true }], "value": "https://example.com" },
        { "action": "parent_page", "when": [], "value": "page-1" },
        { "action": "update", "when": [], "value": "not an object" },
    ]));

    let result = engine.run_with_report(&row(json!({ "vip": "false" })));
    assert_eq!(
        result.effects,
        vec![
            SubmitEffect::Message("Thanks!".to_string()),
            SubmitEffect::Redirect { kind: RedirectKind::ParentPage, target: json!("page-1") },
        ]
    );
    assert_eq!(result.report.skipped.len(), 1);
    assert_eq!(result.report.skipped[0].id, 3);
    assert_eq!(result.data, row(json!({ "vip": "false" })));
}
