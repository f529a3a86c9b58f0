//! Sequential rule application.
//!
//! Both engines share one loop:
//!
//! ```text
//! working = row.clone()
//! for rule in rules (declaration order):
//!     if every rule.when holds against `working`:
//!         apply rule to `working`          <- later rules see this write
//! return working
//! ```
//!
//! Conditions are evaluated against the *working copy*, never against the
//! input row, so a rule may react to a value set by an earlier rule in the
//! same phase. Rules fire at most once per run; there is no fixpoint loop.
//!
//! Engines follow the collaborator lifecycle hosts already expect:
//!
//! ```text
//! new() -> form_load(form) -> load_settings(defs) -> object_load(source) -> process*(row)
//! ```

use super::comparer::is_empty_value;
use super::compiled_rules::{CompiledCondition, CompiledRecordRule, CompiledRules, CompiledSubmitRule, RuleId};
use super::metrics::{Phase, RunReport, RunResult};
use super::resolve::FieldLookup;
use crate::collab::DataSource;
use crate::form::FormView;
use crate::tree::NodeId;
use crate::{RecordAction, Row, SubmitAction, SubmitEffect};
use serde_json::Value;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, trace};

/// Book-keeping shared by both engines during one run.
struct Run<'s> {
    lookup: FieldLookup<'s>,
    working: Row,
    fired: Vec<RuleId>,
    touched_fields: Vec<String>,
    effects: Vec<SubmitEffect>,
}

impl<'s> Run<'s> {
    fn new(source: Option<&'s dyn DataSource>, row: &Row) -> Self {
        Run {
            lookup: FieldLookup::new(source),
            working: row.clone(),
            fired: Vec::new(),
            touched_fields: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn conditions_hold(&self, when: &[CompiledCondition]) -> bool {
        when.iter().all(|condition| condition.holds(&self.lookup, &self.working))
    }

    fn write(&mut self, field_id: &str, value: Value) {
        self.lookup.set(&mut self.working, field_id, value);
        if !self.touched_fields.iter().any(|f| f == field_id) {
            self.touched_fields.push(field_id.to_string());
        }
    }

    fn is_empty(&self, field_id: &str) -> bool {
        self.lookup.get(&self.working, field_id).is_none_or(is_empty_value)
    }

    fn finish<R>(self, phase: Phase, form: Option<&FormView>, compiled: &CompiledRules<R>, started: Instant) -> RunResult {
        let touched_nodes: Vec<NodeId> = form
            .map(|form| self.touched_fields.iter().flat_map(|field_id| form.tree().nodes_for_field(field_id)).collect())
            .unwrap_or_default();

        debug!(?phase, fired = ?self.fired, touched = ?self.touched_fields, "rule run finished");

        RunResult {
            data: self.working,
            effects: self.effects,
            report: RunReport {
                phase,
                fired: self.fired,
                skipped: compiled.skipped.clone(),
                touched_fields: self.touched_fields,
                touched_nodes,
                elapsed: started.elapsed(),
            },
        }
    }
}

/// Record-rule engine: runs on load (`process_pre`) and after edits (`process`).
#[derive(Default)]
pub struct RecordRules<'a> {
    form: Option<&'a FormView>,
    object: Option<Rc<dyn DataSource>>,
    compiled: CompiledRules<CompiledRecordRule>,
}

impl<'a> RecordRules<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form_load(&mut self, form: &'a FormView) {
        self.form = Some(form);
    }

    /// Replace the rule set with a fresh compilation of `defs`.
    pub fn load_settings(&mut self, defs: &[Value]) {
        self.compiled = CompiledRules::record(defs);
    }

    pub fn object_load(&mut self, object: Option<Rc<dyn DataSource>>) {
        self.object = object;
    }

    pub fn rules(&self) -> &CompiledRules<CompiledRecordRule> {
        &self.compiled
    }

    /// Load-time pass: derive and default-fill a copy of `row`.
    pub fn process_pre(&self, row: &Row) -> Row {
        self.run_with_report(Phase::Pre, row).data
    }

    /// Post-edit pass. Callers validate `row` first.
    pub fn process(&self, row: &Row) -> Row {
        self.run_with_report(Phase::Process, row).data
    }

    /// Run every rule once, in order, and report what happened.
    pub fn run_with_report(&self, phase: Phase, row: &Row) -> RunResult {
        let started = Instant::now();
        let mut run = Run::new(self.object.as_deref(), row);

        for rule in &self.compiled.rules {
            if !run.conditions_hold(&rule.when) {
                trace!(rule = rule.id, ?phase, "record rule conditions not met");
                continue;
            }
            debug!(rule = rule.id, ?phase, action = ?rule.action, "record rule fired");
            run.fired.push(rule.id);

            for assignment in &rule.values {
                match rule.action {
                    RecordAction::Update => run.write(&assignment.field_id, assignment.value.clone()),
                    RecordAction::Fill => {
                        if run.is_empty(&assignment.field_id) {
                            run.write(&assignment.field_id, assignment.value.clone());
                        }
                    }
                    RecordAction::Clear => run.write(&assignment.field_id, Value::Null),
                }
            }
        }

        run.finish(phase, self.form, &self.compiled, started)
    }
}

/// Submit-rule engine: runs once right before a record is saved.
#[derive(Default)]
pub struct SubmitRules<'a> {
    form: Option<&'a FormView>,
    object: Option<Rc<dyn DataSource>>,
    compiled: CompiledRules<CompiledSubmitRule>,
}

impl<'a> SubmitRules<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form_load(&mut self, form: &'a FormView) {
        self.form = Some(form);
    }

    /// Replace the rule set with a fresh compilation of `defs`.
    pub fn load_settings(&mut self, defs: &[Value]) {
        self.compiled = CompiledRules::submit(defs);
    }

    pub fn object_load(&mut self, object: Option<Rc<dyn DataSource>>) {
        self.object = object;
    }

    pub fn rules(&self) -> &CompiledRules<CompiledSubmitRule> {
        &self.compiled
    }

    pub fn process(&self, row: &Row) -> Row {
        self.run_with_report(row).data
    }

    pub fn run_with_report(&self, row: &Row) -> RunResult {
        let started = Instant::now();
        let mut run = Run::new(self.object.as_deref(), row);

        for rule in &self.compiled.rules {
            if !run.conditions_hold(&rule.when) {
                trace!(rule = rule.id, "submit rule conditions not met");
                continue;
            }
            debug!(rule = rule.id, action = ?rule.action, "submit rule fired");
            run.fired.push(rule.id);

            match rule.action {
                SubmitAction::Update => {
                    if let Value::Object(assignments) = &rule.value {
                        for (field_id, value) in assignments {
                            run.write(field_id, value.clone());
                        }
                    }
                }
                SubmitAction::Message => {
                    let text = match &rule.value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    run.effects.push(SubmitEffect::Message(text));
                }
                SubmitAction::Redirect(kind) => {
                    run.effects.push(SubmitEffect::Redirect { kind, target: rule.value.clone() })
                }
            }
        }

        run.finish(Phase::Submit, self.form, &self.compiled, started)
    }
}
