//! Rule engines.
//!
//! This module is the entry point for the record-rule and submit-rule
//! engines a form runs its rows through. The parts are split into focused
//! submodules under `src/engine/`:
//!
//! ```text
//! settings.recordRules / submitRules (JSON)
//!               │  CompiledRules::record / ::submit   (compiled_rules.rs)
//!               │    - deserialize definitions
//!               │    - resolve action + comparers, skip the malformed
//!               v
//!   RecordRules / SubmitRules  ◀── form_load, object_load  (processor.rs)
//!               │
//!   row ──▶ for each rule, in order:
//!               │    - look fields up via the data source   (resolve.rs)
//!               │    - evaluate every `when`                (comparer.rs)
//!               │    - apply assignments to the working copy
//!               v
//!        RunResult { data, effects, report }                (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `compiled_rules.rs`: typed, validated rules derived from settings.
//! - `comparer.rs`: loose value comparison used by conditions.
//! - `resolve.rs`: field id -> row column mapping.
//! - `processor.rs`: the two engines and their shared sequential loop.
//! - `metrics.rs`: run reports for previews and debugging.
//!
//! ## Debugging
//!
//! Every fired rule is logged at `debug`, every rule whose conditions did not
//! hold at `trace`, and every skipped definition at `warn` (target
//! `formview::engine`).

#[path = "engine/comparer.rs"]
mod comparer;
#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/processor.rs"]
mod processor;
#[path = "engine/resolve.rs"]
mod resolve;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use comparer::Comparer;
pub(crate) use comparer::{as_number, is_empty_value, parse_datetime};
pub use compiled_rules::{CompiledCondition, CompiledRecordRule, CompiledRules, CompiledSubmitRule, RuleId, SkippedRule};
pub use metrics::{Phase, RunReport, RunResult};
pub use processor::{RecordRules, SubmitRules};
