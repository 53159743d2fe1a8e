// Copyright 2025 Cowboy AI, LLC.

//! Domain events consumed by the automation pipeline
//!
//! Events are immutable facts produced by the business layer after it has
//! committed its own state change. The event set is a closed tagged union:
//! adding an event kind means adding a variant here, a [`TriggerKind`], and
//! a handler registration, all checked at compile time by exhaustive
//! matching rather than discovered through reflection.

use crate::identifiers::{ContactId, EventId, ListId};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The category of domain event an automation rule reacts to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum TriggerKind {
    /// A contact was created
    ContactCreated,
    /// A tag was added to a contact
    ContactTagAdded,
    /// A contact opened a campaign email
    EmailOpened,
    /// A contact clicked a link in a campaign email
    EmailClicked,
    /// A contact joined a marketing list
    ContactListJoined,
}

impl TriggerKind {
    /// All trigger kinds, in declaration order
    pub fn all() -> [TriggerKind; 5] {
        [
            TriggerKind::ContactCreated,
            TriggerKind::ContactTagAdded,
            TriggerKind::EmailOpened,
            TriggerKind::EmailClicked,
            TriggerKind::ContactListJoined,
        ]
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerKind::ContactCreated => "ContactCreated",
            TriggerKind::ContactTagAdded => "ContactTagAdded",
            TriggerKind::EmailOpened => "EmailOpened",
            TriggerKind::EmailClicked => "EmailClicked",
            TriggerKind::ContactListJoined => "ContactListJoined",
        };
        write!(f, "{name}")
    }
}

/// A domain event: something that happened, described once, consumed once
/// per subscriber
///
/// Every variant carries the subject contact id, a unique event id for
/// logging and idempotency, and the occurrence timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    /// A contact was created
    ContactCreated {
        /// Unique event id
        event_id: EventId,
        /// The new contact
        contact_id: ContactId,
        /// Contact email address
        email: String,
        /// Contact first name
        first_name: String,
        /// Contact last name
        last_name: String,
        /// When the contact was created
        occurred_at: DateTime<Utc>,
    },

    /// A tag was added to a contact
    ContactTagAdded {
        /// Unique event id
        event_id: EventId,
        /// The tagged contact
        contact_id: ContactId,
        /// Contact email address
        contact_email: String,
        /// The tag that was added
        tag_name: String,
        /// When the tag was added
        occurred_at: DateTime<Utc>,
    },

    /// A contact opened a campaign email
    EmailOpened {
        /// Unique event id
        event_id: EventId,
        /// The contact who opened
        contact_id: ContactId,
        /// Contact email address
        contact_email: String,
        /// The campaign the message belonged to
        campaign_id: Uuid,
        /// The individual message that was opened
        message_id: Uuid,
        /// When the open was tracked
        occurred_at: DateTime<Utc>,
    },

    /// A contact clicked a link in a campaign email
    EmailClicked {
        /// Unique event id
        event_id: EventId,
        /// The contact who clicked
        contact_id: ContactId,
        /// Contact email address
        contact_email: String,
        /// The campaign the message belonged to
        campaign_id: Uuid,
        /// The individual message that was clicked
        message_id: Uuid,
        /// The URL that was clicked
        clicked_url: String,
        /// When the click was tracked
        occurred_at: DateTime<Utc>,
    },

    /// A contact joined a marketing list
    ContactListJoined {
        /// Unique event id
        event_id: EventId,
        /// The contact who joined
        contact_id: ContactId,
        /// Contact email address
        contact_email: String,
        /// The list that was joined
        list_id: ListId,
        /// Display name of the list
        list_name: String,
        /// When the contact joined
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The trigger kind this event maps to
    pub fn kind(&self) -> TriggerKind {
        match self {
            DomainEvent::ContactCreated { .. } => TriggerKind::ContactCreated,
            DomainEvent::ContactTagAdded { .. } => TriggerKind::ContactTagAdded,
            DomainEvent::EmailOpened { .. } => TriggerKind::EmailOpened,
            DomainEvent::EmailClicked { .. } => TriggerKind::EmailClicked,
            DomainEvent::ContactListJoined { .. } => TriggerKind::ContactListJoined,
        }
    }

    /// The unique event id
    pub fn event_id(&self) -> EventId {
        match self {
            DomainEvent::ContactCreated { event_id, .. }
            | DomainEvent::ContactTagAdded { event_id, .. }
            | DomainEvent::EmailOpened { event_id, .. }
            | DomainEvent::EmailClicked { event_id, .. }
            | DomainEvent::ContactListJoined { event_id, .. } => *event_id,
        }
    }

    /// The subject contact id
    pub fn contact_id(&self) -> ContactId {
        match self {
            DomainEvent::ContactCreated { contact_id, .. }
            | DomainEvent::ContactTagAdded { contact_id, .. }
            | DomainEvent::EmailOpened { contact_id, .. }
            | DomainEvent::EmailClicked { contact_id, .. }
            | DomainEvent::ContactListJoined { contact_id, .. } => *contact_id,
        }
    }

    /// When the event occurred
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ContactCreated { occurred_at, .. }
            | DomainEvent::ContactTagAdded { occurred_at, .. }
            | DomainEvent::EmailOpened { occurred_at, .. }
            | DomainEvent::EmailClicked { occurred_at, .. }
            | DomainEvent::ContactListJoined { occurred_at, .. } => *occurred_at,
        }
    }
}
