// Copyright 2025 Cowboy AI, LLC.

//! Per-event evaluation context
//!
//! An [`EvaluationContext`] is ephemeral key-value data derived from one
//! event, visible to that event's condition and action evaluation only. It
//! is never persisted as state, but it does travel inside scheduled-action
//! job payloads so a deferred action sees the context of the event that
//! deferred it.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known context keys set by the trigger handlers
pub mod keys {
    /// Email address of the subject contact
    pub const CONTACT_EMAIL: &str = "contactEmail";
    /// Occurrence timestamp of the event, RFC 3339
    pub const EVENT_TIME: &str = "eventTime";
    /// Tag that was added (ContactTagAdded)
    pub const TAG_ADDED: &str = "tagAdded";
    /// Campaign id (EmailOpened / EmailClicked)
    pub const CAMPAIGN_ID: &str = "campaignId";
    /// Message id (EmailOpened / EmailClicked)
    pub const MESSAGE_ID: &str = "messageId";
    /// Clicked URL (EmailClicked)
    pub const CLICKED_URL: &str = "clickedUrl";
    /// List id (ContactListJoined)
    pub const LIST_ID: &str = "listId";
    /// List name (ContactListJoined)
    pub const LIST_NAME: &str = "listName";
    /// Flag: the current event is an email open
    pub const EMAIL_OPENED: &str = "emailOpened";
    /// Flag: the current event is an email click
    pub const EMAIL_CLICKED: &str = "emailClicked";
}

/// Ephemeral key-value data for one rule-evaluation pass
///
/// Insertion-ordered so log output and serialized job payloads are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationContext {
    values: IndexMap<String, Value>,
}

impl EvaluationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style set
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value for a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String view of a value; numbers and booleans are rendered
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean flag; absent or non-boolean keys read as `false`
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(Value::Bool(true)))
    }

    /// Whether the context has a value for the key
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
