// Copyright 2025 Cowboy AI, LLC.

//! Contact aggregate
//!
//! The automation engine mutates contact state (tags, lead score, list
//! memberships) but does not own the contact lifecycle; creation and
//! deletion happen in the CRUD layer. All mutators are idempotent where the
//! operation is naturally a set operation: adding a present tag or removing
//! an absent one is a no-op, never an error.

use crate::identifiers::{ContactId, ListId, TenantId};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Membership of a contact in a marketing list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListMembership {
    /// The list id
    pub list_id: ListId,
    /// Display name of the list at join time
    pub list_name: String,
}

/// A contact within a tenant
///
/// Saved through [`crate::ports::ContactStore`] under the backing store's
/// normal optimistic-concurrency rules; the engine adds no locking of its
/// own, so concurrent workers mutating the same contact are a documented
/// lost-update hazard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Contact {
    /// Contact id
    pub id: ContactId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Email address
    pub email: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Tag set
    pub tags: HashSet<String>,
    /// Lead score; signed, no floor or ceiling
    pub lead_score: i64,
    /// List memberships
    pub lists: Vec<ListMembership>,
    /// Last activity timestamp, touched by engagement events
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Contact {
    /// Create a contact with empty tags, zero score, and no memberships
    pub fn new(
        id: ContactId,
        tenant_id: TenantId,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            tags: HashSet::new(),
            lead_score: 0,
            lists: Vec::new(),
            last_activity_at: None,
        }
    }

    /// Whether the contact carries the tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Add a tag; set union, so re-adding is a no-op
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Remove a tag; removing an absent tag is a no-op
    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.remove(tag);
    }

    /// Whether the contact is a member of the list, matched by id or name
    pub fn in_list(&self, list: &str) -> bool {
        self.lists
            .iter()
            .any(|m| m.list_name == list || m.list_id.to_string() == list)
    }

    /// Join a list; joining an already-joined list is a no-op
    pub fn join_list(&mut self, list_id: ListId, list_name: impl Into<String>) {
        if !self.lists.iter().any(|m| m.list_id == list_id) {
            self.lists.push(ListMembership {
                list_id,
                list_name: list_name.into(),
            });
        }
    }

    /// Leave a list; leaving a non-member list is a no-op
    pub fn leave_list(&mut self, list_id: &ListId) {
        self.lists.retain(|m| &m.list_id != list_id);
    }

    /// Add a signed delta to the lead score
    ///
    /// No clamping: scores may go negative. Confirmed open question, see
    /// DESIGN notes.
    pub fn adjust_lead_score(&mut self, delta: i64) {
        self.lead_score += delta;
    }

    /// Record activity at the given time
    pub fn touch_activity(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = Some(at);
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
