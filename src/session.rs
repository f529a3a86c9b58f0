use crate::engine::{RecordRules, SubmitRules};
use crate::form::FormView;

/// The record and submit engines of one form, bound to its current settings
/// and data source.
///
/// A session is cheap and short-lived: build one per operation with
/// [`build_rule_session`] (or [`FormView::rule_session`]) instead of keeping
/// it around, so edits to the rule settings are always picked up.
pub struct RuleSession<'a> {
    pub record: RecordRules<'a>,
    pub submit: SubmitRules<'a>,
}

/// Compile `form`'s current rule settings and bind both engines to `form`
/// and to its data source (if one is still alive).
pub fn build_rule_session(form: &FormView) -> RuleSession<'_> {
    RuleSession { record: record_engine(form), submit: submit_engine(form) }
}

pub(crate) fn record_engine(form: &FormView) -> RecordRules<'_> {
    let mut record = RecordRules::new();
    record.form_load(form);
    record.load_settings(form.settings().record_rule_defs());
    record.object_load(form.resolve_data_source());
    record
}

pub(crate) fn submit_engine(form: &FormView) -> SubmitRules<'_> {
    let mut submit = SubmitRules::new();
    submit.form_load(form);
    submit.load_settings(form.settings().submit_rule_defs());
    submit.object_load(form.resolve_data_source());
    submit
}
