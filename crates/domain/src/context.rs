//! Execution contexts: who is asking, and with which isolation.
//!
//! Request-driven work always runs inside a single tenant. The delayed
//! action worker is the one caller allowed to look across tenants, and it
//! has to say so explicitly by holding a [`SystemContext`].

use crate::id::TenantId;

/// Capability token for cross-tenant queries.
///
/// There is no `Default` impl and no global instance; the only way to get
/// one is [`SystemContext::background_worker`], so every cross-tenant call
/// site is visible in the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemContext {
    purpose: &'static str,
}

impl SystemContext {
    /// Context for the delayed action worker's batch scan.
    #[must_use]
    pub fn background_worker() -> Self {
        Self {
            purpose: "delayed-action-worker",
        }
    }

    /// Short label describing why isolation is bypassed (for logs).
    #[must_use]
    pub fn purpose(&self) -> &'static str {
        self.purpose
    }

    /// Narrow back to a single tenant before touching tenant-scoped data.
    #[must_use]
    pub fn scoped(&self, tenant_id: TenantId) -> TenantContext {
        TenantContext { tenant_id }
    }
}

/// Per-tenant context every tenant-scoped operation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
