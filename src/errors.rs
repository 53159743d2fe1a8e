// Copyright 2025 Cowboy AI, LLC.

//! Error types for the automation pipeline
//!
//! Nothing in this crate throws past a per-event, per-rule, or per-action
//! boundary; these types classify what went wrong so each boundary can
//! decide whether to log-and-continue or abort its own unit of work.

use crate::identifiers::{ContactId, RuleId};
use crate::rule::ActionType;
use thiserror::Error;

/// Errors that can occur in the automation pipeline
#[derive(Debug, Clone, Error)]
pub enum AutomationError {
    /// No handler is registered for an event kind (configuration gap)
    #[error("No handler registered for trigger kind {kind}")]
    HandlerNotRegistered {
        /// The unhandled trigger kind, as a display string
        kind: String,
    },

    /// Contact not found in the contact store
    #[error("Contact not found: {0}")]
    ContactNotFound(ContactId),

    /// Rule not found in the rule store
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    /// A unit of work arrived without a tenant context
    #[error("Tenant context missing: {0}")]
    TenantContextMissing(String),

    /// An action failed against an external collaborator
    #[error("Action {action_type:?} failed for rule {rule_id}, contact {contact_id}: {message}")]
    ActionFailed {
        /// Rule whose branch contained the action
        rule_id: RuleId,
        /// Contact the action was applied to
        contact_id: ContactId,
        /// The action type that failed
        action_type: ActionType,
        /// Error message from the collaborator
        message: String,
    },

    /// A condition referenced a field that could not be interpreted
    #[error("Condition evaluation error on field '{field}': {message}")]
    ConditionEvaluation {
        /// Field named by the condition
        field: String,
        /// What could not be interpreted
        message: String,
    },

    /// The dispatcher's bounded intake queue is full
    #[error("Dispatch queue full, event not accepted")]
    QueueFull,

    /// The dispatcher has been shut down
    #[error("Dispatcher is shut down")]
    DispatcherClosed,

    /// External service error
    #[error("External service error: {service} - {message}")]
    ExternalServiceError {
        /// Name of the external service
        service: String,
        /// Error message from the service
        message: String,
    },

    /// Storage error from a store collaborator
    #[error("Store error: {0}")]
    StoreError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::SerializationError(err.to_string())
    }
}

impl AutomationError {
    /// Check if this is a not-found error (contact or rule)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AutomationError::ContactNotFound(_) | AutomationError::RuleNotFound(_)
        )
    }

    /// Check if this is a configuration gap rather than a runtime fault
    pub fn is_configuration_gap(&self) -> bool {
        matches!(self, AutomationError::HandlerNotRegistered { .. })
    }

    /// Check if this error indicates lost tenant scoping
    ///
    /// The most severe class in the taxonomy: proceeding without a tenant
    /// risks cross-tenant data exposure.
    pub fn is_tenant_loss(&self) -> bool {
        matches!(self, AutomationError::TenantContextMissing(_))
    }

    /// Check if this error came from an external collaborator
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            AutomationError::ActionFailed { .. } | AutomationError::ExternalServiceError { .. }
        )
    }
}
