//! # orderflow-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the persistence port traits defined in `orderflow-app::ports`
//!   (`AutomationRuleRepository`, `DelayedActionStore`, `RuleLogRepository`)
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `orderflow-app` (for port traits) and `orderflow-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod codec;
pub mod error;
pub mod pool;

mod automation_rule_repo;
mod delayed_action_store;
mod rule_log_repo;

pub use automation_rule_repo::SqliteAutomationRuleRepository;
pub use delayed_action_store::SqliteDelayedActionStore;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use rule_log_repo::SqliteRuleLogRepository;
