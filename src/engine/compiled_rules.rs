//! Rule compilation.
//!
//! Rule definitions are stored in settings as loosely-typed JSON. Before a run
//! they are compiled into typed rules:
//!
//! 1. deserialize the definition (`RecordRuleDef` / `SubmitRuleDef`);
//! 2. resolve the action key;
//! 3. parse every comparer and pre-compile `matches` patterns.
//!
//! A definition failing any step is *skipped*, not fatal: it is recorded in
//! `CompiledRules::skipped` and logged, and the remaining rules still run.
//!
//! ## Invariants
//!
//! - `RuleId` is the index of the definition in the settings list, so ids
//!   stay stable whether or not earlier definitions were skipped.
//! - `CompiledRules::rules` keeps declaration order; the processor relies on
//!   it for sequential application.

use super::comparer::Comparer;
use super::resolve::FieldLookup;
use crate::{Condition, RecordAction, RecordRuleDef, Row, SubmitAction, SubmitRuleDef, ValueAssignment};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Rule identifier (index into the persisted rule list).
pub type RuleId = usize;

/// A rule definition that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    pub id: RuleId,
    pub reason: String,
}

/// A condition with its comparer resolved.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    pub field_id: String,
    pub comparer: Comparer,
    pub value: Value,
    pattern: Option<Regex>,
}

impl CompiledCondition {
    pub fn compile(condition: &Condition) -> Result<Self, String> {
        let comparer = Comparer::parse(&condition.comparer)
            .ok_or_else(|| format!("unknown comparer `{}` on field `{}`", condition.comparer, condition.field_id))?;

        let pattern = match comparer {
            Comparer::Matches => {
                let source = condition.value.as_str().ok_or_else(|| "`matches` expects a string pattern".to_string())?;
                Some(Regex::new(source).map_err(|err| format!("invalid pattern `{source}`: {err}"))?)
            }
            _ => None,
        };

        Ok(CompiledCondition { field_id: condition.field_id.clone(), comparer, value: condition.value.clone(), pattern })
    }

    pub(crate) fn holds(&self, lookup: &FieldLookup<'_>, row: &Row) -> bool {
        self.comparer.evaluate(lookup.get(row, &self.field_id), &self.value, self.pattern.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRecordRule {
    pub id: RuleId,
    pub action: RecordAction,
    pub when: Vec<CompiledCondition>,
    pub values: Vec<ValueAssignment>,
}

#[derive(Debug, Clone)]
pub struct CompiledSubmitRule {
    pub id: RuleId,
    pub action: SubmitAction,
    pub when: Vec<CompiledCondition>,
    pub value: Value,
}

/// Compiled rules in declaration order, plus what was left out.
#[derive(Debug, Clone)]
pub struct CompiledRules<R> {
    pub rules: Vec<R>,
    pub skipped: Vec<SkippedRule>,
}

impl<R> Default for CompiledRules<R> {
    fn default() -> Self {
        CompiledRules { rules: Vec::new(), skipped: Vec::new() }
    }
}

impl<R> CompiledRules<R> {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl CompiledRules<CompiledRecordRule> {
    /// Compile `settings.recordRules`.
    pub fn record(defs: &[Value]) -> Self {
        compile_all(defs, "record", |id, def: RecordRuleDef| {
            let action = RecordAction::parse(def.action.as_deref())
                .ok_or_else(|| format!("unknown record action `{}`", def.action.as_deref().unwrap_or_default()))?;
            Ok(CompiledRecordRule { id, action, when: compile_conditions(&def.when)?, values: def.values })
        })
    }
}

impl CompiledRules<CompiledSubmitRule> {
    /// Compile `settings.submitRules`.
    pub fn submit(defs: &[Value]) -> Self {
        compile_all(defs, "submit", |id, def: SubmitRuleDef| {
            let action = SubmitAction::parse(def.action.as_deref())
                .ok_or_else(|| format!("unknown submit action `{}`", def.action.as_deref().unwrap_or_default()))?;
            match action {
                SubmitAction::Update if !def.value.is_object() => {
                    return Err("update value must be an object of field id -> value".to_string());
                }
                SubmitAction::Message | SubmitAction::Redirect(_) if def.value.is_null() => {
                    return Err("submit rule has no value".to_string());
                }
                _ => {}
            }
            Ok(CompiledSubmitRule { id, action, when: compile_conditions(&def.when)?, value: def.value })
        })
    }
}

fn compile_conditions(when: &[Condition]) -> Result<Vec<CompiledCondition>, String> {
    when.iter().map(CompiledCondition::compile).collect()
}

fn compile_all<D, R, F>(defs: &[Value], kind: &str, compile: F) -> CompiledRules<R>
where
    D: DeserializeOwned,
    F: Fn(RuleId, D) -> Result<R, String>,
{
    let mut compiled = CompiledRules::default();

    for (id, raw) in defs.iter().enumerate() {
        let outcome = serde_json::from_value::<D>(raw.clone()).map_err(|err| err.to_string()).and_then(|def| compile(id, def));
        match outcome {
            Ok(rule) => compiled.rules.push(rule),
            Err(reason) => {
                warn!(rule = id, kind, %reason, "skipping malformed rule definition");
                compiled.skipped.push(SkippedRule { id, reason });
            }
        }
    }

    compiled
}
