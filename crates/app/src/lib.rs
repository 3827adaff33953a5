//! # orderflow-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `AutomationRuleRepository`: tenant-scoped CRUD for rules, fire counting
//!   - `DelayedActionStore`: durable queue of deferred actions
//!   - `RuleLogRepository`: append-only execution audit trail
//!   - `ActionSink`: the integrations that perform actions
//! - Implement the trigger pipeline:
//!   - `RuleMatcher`: candidate selection and ordering
//!   - `ActionExecutor`: inline execution or scheduling of each action
//!   - `AutomationEngine`: evaluation, firing and logging per trigger event
//!   - `DelayedActionWorker`: background execution of due actions
//! - Define **driving/inbound ports** as use-case structs:
//!   - `AutomationService`: rule CRUD, dry runs, logs
//!   - `DelayedActionService`: inspection and replay
//!
//! ## Dependency rule
//! Depends on `orderflow-domain` only (plus `tokio` for the worker task).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod action_executor;
pub mod automation_engine;
pub mod delayed_action_worker;
pub mod ports;
pub mod rule_matcher;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
