//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`OrderFlowError`] via `#[from]` (or an explicit `From` impl for
//! boxed adapter errors).

use std::error::Error as StdError;

/// Top-level error returned by repositories and application services.
#[derive(Debug, thiserror::Error)]
pub enum OrderFlowError {
    /// A rule definition or request violates a domain invariant.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A requested record does not exist (in the caller's tenant).
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Persistence failed. These errors propagate out of trigger processing
    /// because fire-count and log integrity depend on them.
    #[error("storage error")]
    Storage(#[source] Box<dyn StdError + Send + Sync>),
}

/// Domain invariant violations, rejected at rule-creation time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("unknown trigger event `{0}`")]
    UnknownTriggerEvent(String),

    #[error("unknown condition operator `{0}`")]
    UnknownOperator(String),

    #[error("unknown action type `{0}`")]
    UnknownActionType(String),

    #[error("condition field must not be empty")]
    EmptyConditionField,

    #[error("operator `{operator}` on field `{field}` requires {expected}")]
    InvalidConditionValue {
        field: String,
        operator: &'static str,
        expected: &'static str,
    },

    #[error("invalid config for action `{action}`: {reason}")]
    InvalidActionConfig { action: &'static str, reason: String },

    #[error("delayed action {0} has not been executed yet")]
    DelayedActionPending(String),
}

/// A lookup found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure reported by an Action Sink integration.
///
/// Action errors never abort sibling actions; they are recorded as strings
/// on the rule log or on the delayed action row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{action_type} failed: {reason}")]
pub struct ActionError {
    pub action_type: &'static str,
    pub reason: String,
}

impl ActionError {
    #[must_use]
    pub fn new(action_type: &'static str, reason: impl Into<String>) -> Self {
        Self {
            action_type,
            reason: reason.into(),
        }
    }
}
