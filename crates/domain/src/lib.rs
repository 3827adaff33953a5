//! # orderflow-domain
//!
//! Pure domain model for the orderflow automation rule engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **execution contexts** (per-tenant requests vs. the cross-tenant system worker)
//! - Define **Automation rules** (trigger event → conditions → actions)
//! - Define the **Condition evaluator** (pure predicate over event data)
//! - Define **Delayed actions** and **Rule logs** (execution audit trail)
//! - Define the **Event context** handed to the engine by event producers
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod context;
pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod delayed_action;
pub mod event;
pub mod rule_log;
