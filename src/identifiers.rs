// Copyright 2025 Cowboy AI, LLC.

//! Identifier types for tenants, contacts, rules, lists, events, and jobs
//!
//! Every identifier is a typed UUID newtype so that a rule id can never be
//! passed where a contact id is expected. Identifiers carry no behavior
//! beyond construction, display, and conversion.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from a UUID
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<&$name> for Uuid {
            fn from(id: &$name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Tenant ID - the ownership scope for every piece of data in the system
    ///
    /// Every store lookup and every dispatched unit of work is scoped by a
    /// tenant id; see [`crate::tenant::TenantContext`].
    TenantId
}

uuid_id! {
    /// Contact ID - identifies a contact aggregate within a tenant
    ContactId
}

uuid_id! {
    /// Rule ID - identifies an automation rule within a tenant
    RuleId
}

uuid_id! {
    /// List ID - identifies a marketing list within a tenant
    ListId
}

uuid_id! {
    /// Event ID - unique per published domain event
    ///
    /// Used for logging and for the dispatcher's duplicate-delivery guard.
    EventId
}

uuid_id! {
    /// Job ID - identifies a scheduled (deferred) action job
    JobId
}
