//! The form view and its lifecycle entry points.
//!
//! ```text
//! host row ──▶ do_record_rules_pre ──▶ record engine (pre)      ──▶ row for display
//! edited   ──▶ do_record_rules     ──▶ DataSource::is_valid_data
//!                                       ├─ fail ──▶ Err(Validation { row, .. })
//!                                       └─ pass ──▶ record engine ──▶ row
//! to save  ──▶ do_submit_rules     ──▶ submit engine            ──▶ row (+ effects)
//! ```
//!
//! These three calls are the only sanctioned way for row data to be rewritten
//! by the form. Each one builds its engine from the settings as they are *now*.

use crate::collab::{Application, DataField, DataSource, ViewCommon};
use crate::engine::{RecordRules, RunResult, SubmitRules};
use crate::error::{FormError, Result};
use crate::session::{RuleSession, build_rule_session, record_engine, submit_engine};
use crate::settings::FormSettings;
use crate::tree::{Capabilities, NodeId, ViewNode, ViewTree};
use crate::Row;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, error};

static FORM_COMMON: Lazy<ViewCommon> = Lazy::new(|| ViewCommon::new("mobile-form", "list-alt", "Form"));

/// View kinds the editor may drop onto a form besides field items.
const ALLOWED_COMPONENTS: &[&str] = &["mobile-label", "mobile-button", "mobile-text"];

/// A form: settings, a tree of components, and a weak binding to the data
/// source whose records it edits.
#[derive(Debug)]
pub struct FormView {
    id: String,
    values: Map<String, Value>,
    settings: FormSettings,
    tree: ViewTree,
    data_source: Option<Weak<dyn DataSource>>,
    current_object: Option<Weak<dyn DataSource>>,
}

impl FormView {
    /// Build a form from its persisted settings, normalizing them.
    pub fn from_values(id: impl Into<String>, mut values: Map<String, Value>) -> Result<Self> {
        let settings = FormSettings::normalize(&mut values)?;
        Ok(FormView {
            id: id.into(),
            values,
            settings,
            tree: ViewTree::new(),
            data_source: None,
            current_object: None,
        })
    }

    /// Registration data of the form view kind.
    pub fn common() -> &'static ViewCommon {
        &FORM_COMMON
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// Normalized persisted settings (unknown keys included).
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Replace the settings, as the editor does after a property change.
    ///
    /// On error the previous settings stay in place.
    pub fn update_settings(&mut self, mut values: Map<String, Value>) -> Result<()> {
        self.settings = FormSettings::normalize(&mut values)?;
        self.values = values;
        Ok(())
    }

    pub fn clear_on_load(&self) -> bool {
        self.settings.clear_on_load
    }

    pub fn clear_on_save(&self) -> bool {
        self.settings.clear_on_save
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ViewTree {
        &mut self.tree
    }

    // --- Data binding -----------------------------------------------------

    /// Bind the data source of this form's data collection. Only a weak
    /// reference is kept.
    pub fn bind_data_source(&mut self, source: &Rc<dyn DataSource>) {
        self.data_source = Some(Rc::downgrade(source));
    }

    /// The bound data source, if it is still alive.
    pub fn resolve_data_source(&self) -> Option<Rc<dyn DataSource>> {
        self.data_source.as_ref().and_then(Weak::upgrade)
    }

    /// Set the currently active record object (used by kanban-style hosts).
    pub fn object_load(&mut self, object: &Rc<dyn DataSource>) {
        self.current_object = Some(Rc::downgrade(object));
    }

    pub fn current_object(&self) -> Option<Rc<dyn DataSource>> {
        self.current_object.as_ref().and_then(Weak::upgrade)
    }

    // --- Components -------------------------------------------------------

    /// Registered view kinds that may be placed on a form.
    pub fn component_list(&self, app: &dyn Application) -> Vec<ViewCommon> {
        app.view_all().into_iter().filter(|view| ALLOWED_COMPONENTS.contains(&view.key.as_str())).collect()
    }

    /// Every field-bound node, depth-first pre-order.
    pub fn field_components(&self) -> Vec<&ViewNode> {
        self.tree.find(ViewNode::is_field)
    }

    /// Every node `filter` accepts, depth-first pre-order.
    pub fn field_components_by<F>(&self, filter: F) -> Vec<&ViewNode>
    where
        F: FnMut(&ViewNode) -> bool,
    {
        self.tree.find(filter)
    }

    /// Drop `field` onto the form as a new top-level item.
    ///
    /// Returns `None` and leaves the tree untouched when there is no field,
    /// no component kind for it, or the kind fails to instantiate.
    pub fn add_field_to_form(
        &mut self,
        app: &dyn Application,
        field: Option<&dyn DataField>,
        y_position: Option<i64>,
    ) -> Option<NodeId> {
        let field = field?;
        let Some(component) = field.form_component() else {
            debug!(field = field.id(), "no form component for field");
            return None;
        };
        let mut template = component.new_instance(app, self)?;

        template.field_id = Some(field.id().to_string());
        template.capabilities |= Capabilities::FIELD_BINDABLE;
        template.settings.insert("fieldId".to_string(), Value::String(field.id().to_string()));
        if let Some(y) = y_position {
            template.position.y = y;
        }

        let id = self.tree.insert(None, template)?;
        debug!(form = %self.id, field = field.id(), node = id.index(), "added field to form");
        Some(id)
    }

    // --- Rules ------------------------------------------------------------

    /// Both engines, freshly built from the current settings.
    pub fn rule_session(&self) -> RuleSession<'_> {
        build_rule_session(self)
    }

    /// Record engine, freshly built from the current settings.
    pub fn record_rules(&self) -> RecordRules<'_> {
        record_engine(self)
    }

    /// Submit engine, freshly built from the current settings.
    pub fn submit_rules(&self) -> SubmitRules<'_> {
        submit_engine(self)
    }

    /// Apply record rules to a row about to be displayed. No validation.
    pub fn do_record_rules_pre(&self, row: &Row) -> Row {
        self.record_rules().process_pre(row)
    }

    /// Validate an edited row against the data source, then apply record rules.
    ///
    /// An invalid row is returned untouched inside [`FormError::Validation`];
    /// no rule runs on it.
    pub fn do_record_rules(&self, row: &Row) -> Result<Row> {
        let Some(object) = self.resolve_data_source() else {
            error!(form = %self.id, "cannot validate record: no data source bound");
            return Err(FormError::MissingDataSource);
        };

        let validation = object.is_valid_data(row);
        if !validation.pass() {
            error!(form = %self.id, failures = ?validation.failures(), "updated data is invalid");
            return Err(FormError::Validation { row: row.clone(), failures: validation.into_failures() });
        }

        Ok(self.record_rules().process(row))
    }

    /// Apply submit rules to a row about to be saved. No validation.
    pub fn do_submit_rules(&self, row: &Row) -> Row {
        self.submit_rules().process(row)
    }

    /// Like [`do_submit_rules`](Self::do_submit_rules), also returning the
    /// messages / redirects requested by the rules that fired.
    pub fn do_submit_rules_with_effects(&self, row: &Row) -> RunResult {
        self.submit_rules().run_with_report(row)
    }
}
