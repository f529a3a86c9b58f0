#[macro_use]
mod macros;
mod collab;
mod engine;
mod error;
mod field;
mod form;
mod session;
mod settings;
mod tree;

pub use collab::{Application, ComponentKind, DataField, DataSource, ValidationFailure, ValidationResult, ViewCommon};
pub use engine::{
    Comparer, CompiledCondition, CompiledRecordRule, CompiledRules, CompiledSubmitRule, Phase, RecordRules, RuleId,
    RunReport, RunResult, SkippedRule, SubmitRules,
};
pub use error::{FormError, Result};
pub use field::{FieldType, SimpleField, SimpleObject, StandardComponent};
pub use form::FormView;
pub use session::{RuleSession, build_rule_session};
pub use settings::{FormSettings, default_values};
pub use tree::{Capabilities, NodeId, NodeTemplate, Position, ViewNode, ViewTree};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record as seen by the rule pipeline: column name -> value.
pub type Row = serde_json::Map<String, Value>;

// --- Persisted rule definitions ---------------------------------------------

/// A single `when` clause of a rule.
///
/// `field_id` names a data-object field; the bound [`DataSource`] maps it to
/// the row column (falling back to the id itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field_id: String,
    pub comparer: String,
    #[serde(default)]
    pub value: Value,
}

/// A `{fieldId, value}` pair assigned by a record rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAssignment {
    pub field_id: String,
    #[serde(default)]
    pub value: Value,
}

/// Record rule as stored in `settings.recordRules`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRuleDef {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub when: Vec<Condition>,
    #[serde(default)]
    pub values: Vec<ValueAssignment>,
}

/// Submit rule as stored in `settings.submitRules`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRuleDef {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub when: Vec<Condition>,
    #[serde(default)]
    pub value: Value,
}

// --- Actions -----------------------------------------------------------------

/// What a record rule does to the row once its conditions hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordAction {
    /// Assign every listed value.
    Update,
    /// Assign a value only when the target field is currently empty.
    Fill,
    /// Set every listed field to `null`.
    Clear,
}

impl RecordAction {
    /// Map a persisted action key to an action. A missing key means `Update`.
    pub fn parse(key: Option<&str>) -> Option<Self> {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Some(RecordAction::Update);
        };
        match key {
            "update" | "updateRecord" | "ABViewRuleActionFormRecordRuleUpdate" => Some(RecordAction::Update),
            "fill" | "default" => Some(RecordAction::Fill),
            "clear" => Some(RecordAction::Clear),
            _ => None,
        }
    }
}

/// Where a submit rule sends the user after a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectKind {
    ExistingPage,
    ParentPage,
    Website,
}

/// What a submit rule does once its conditions hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitAction {
    /// `value` is an object of field id -> value merged into the row.
    Update,
    /// `value` is a message for the host to display.
    Message,
    /// `value` is a page id or URL for the host to navigate to.
    Redirect(RedirectKind),
}

impl SubmitAction {
    /// Map a persisted action key to an action. A missing key means `Update`.
    pub fn parse(key: Option<&str>) -> Option<Self> {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Some(SubmitAction::Update);
        };
        match key {
            "update" | "updateRecord" => Some(SubmitAction::Update),
            "message" | "ABViewRuleActionFormSubmitRuleMessage" => Some(SubmitAction::Message),
            "redirect" | "exists_page" | "ABViewRuleActionFormSubmitRuleExistPage" => {
                Some(SubmitAction::Redirect(RedirectKind::ExistingPage))
            }
            "parent_page" | "ABViewRuleActionFormSubmitRuleParentPage" => {
                Some(SubmitAction::Redirect(RedirectKind::ParentPage))
            }
            "website" | "ABViewRuleActionFormSubmitRuleWebsite" => Some(SubmitAction::Redirect(RedirectKind::Website)),
            _ => None,
        }
    }
}

/// A side effect requested by a submit rule, handed back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitEffect {
    Message(String),
    Redirect { kind: RedirectKind, target: Value },
}
