// Copyright 2025 Cowboy AI, LLC.

//! Tenant scoping context
//!
//! The tenant context is passed explicitly: every store lookup takes a
//! [`TenantContext`] parameter and every dispatched unit of work owns its
//! own copy, captured from the publisher at dispatch time. There is no
//! thread-local state to propagate or clear; a worker's scope ends when its
//! job value is dropped, so a stale tenant id can never leak into the next
//! unit of work run on the same worker.
//!
//! An unscoped context is representable because the dispatcher must be able
//! to observe (and log) its absence; whether an unscoped event proceeds or
//! is dropped is a deployment policy, see
//! [`crate::dispatcher::MissingTenantPolicy`].

use crate::errors::{AutomationError, AutomationResult};
use crate::identifiers::TenantId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The tenant scope for one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TenantContext {
    tenant: Option<TenantId>,
}

impl TenantContext {
    /// Create a context scoped to one tenant
    pub fn scoped(tenant: TenantId) -> Self {
        Self {
            tenant: Some(tenant),
        }
    }

    /// Create an unscoped context
    ///
    /// Publishing with an unscoped context is a defect signal; the
    /// dispatcher logs it and applies the configured policy.
    pub fn unscoped() -> Self {
        Self { tenant: None }
    }

    /// The tenant id, if this context is scoped
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    /// Whether this context carries a tenant id
    pub fn is_scoped(&self) -> bool {
        self.tenant.is_some()
    }

    /// The tenant id, or a [`AutomationError::TenantContextMissing`] error
    ///
    /// Use at boundaries where proceeding without a tenant is not allowed.
    pub fn require_tenant(&self, operation: &str) -> AutomationResult<&TenantId> {
        self.tenant
            .as_ref()
            .ok_or_else(|| AutomationError::TenantContextMissing(operation.to_string()))
    }

    /// Whether data owned by `owner` is visible under this scope
    ///
    /// An unscoped context sees everything; that is exactly why unscoped
    /// execution is policy-gated at the dispatcher.
    pub fn can_access(&self, owner: &TenantId) -> bool {
        match &self.tenant {
            Some(tenant) => tenant == owner,
            None => true,
        }
    }
}

impl From<TenantId> for TenantContext {
    fn from(tenant: TenantId) -> Self {
        Self::scoped(tenant)
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tenant {
            Some(tenant) => write!(f, "tenant:{tenant}"),
            None => write!(f, "tenant:<unscoped>"),
        }
    }
}
