//! Rule run reports.
//!
//! `process` / `process_pre` return just the row. The `*_with_report`
//! variants additionally describe what happened, which is what an editor
//! preview or a debugging host wants:
//!
//! - which rules fired, in firing order;
//! - which rule definitions were skipped at compile time and why;
//! - which fields were written, and the live nodes bound to them (so a host
//!   can refresh exactly those components).

use super::compiled_rules::{RuleId, SkippedRule};
use crate::tree::NodeId;
use crate::{Row, SubmitEffect};
use std::time::Duration;

/// The pass a rule run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Record rules before a record is displayed.
    Pre,
    /// Record rules after the user edited a record.
    Process,
    /// Submit rules right before a save.
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub phase: Phase,
    /// Ids (declaration indices) of the rules whose conditions held.
    pub fired: Vec<RuleId>,
    /// Definitions dropped while compiling this run's rule set.
    pub skipped: Vec<SkippedRule>,
    /// Field ids written, in first-write order.
    pub touched_fields: Vec<String>,
    /// Field-bound nodes of the form editing any touched field.
    pub touched_nodes: Vec<NodeId>,
    pub elapsed: Duration,
}

/// Row output bundled with the run report.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub data: Row,
    /// Host-side effects requested by submit rules (always empty for record rules).
    pub effects: Vec<SubmitEffect>,
    pub report: RunReport,
}
