//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.
//!
//! Every port is also implemented for `Arc<T>` so the engine, the worker and
//! the services can share one adapter instance.

pub mod action_sink;
pub mod delayed_action_store;
pub mod rule_log_repo;
pub mod rule_repo;

pub use action_sink::ActionSink;
pub use delayed_action_store::DelayedActionStore;
pub use rule_log_repo::RuleLogRepository;
pub use rule_repo::AutomationRuleRepository;
