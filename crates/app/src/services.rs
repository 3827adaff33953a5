//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.
//! Every operation runs inside a [`TenantContext`](orderflow_domain::context::TenantContext).

pub mod automation_service;
pub mod delayed_action_service;

pub use automation_service::AutomationService;
pub use delayed_action_service::DelayedActionService;
