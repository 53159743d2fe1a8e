// Copyright 2025 Cowboy AI, LLC.

//! Trigger handlers and their registry
//!
//! A handler knows how to turn one kind of domain event into the inputs of
//! rule evaluation: the subject contact id, the evaluation context, and an
//! optional contact mutation applied before rules run (engagement scoring).
//! The registry is an explicit map built once at startup from a static
//! list and injected into the dispatcher; an unregistered kind resolves to
//! `None`, which the dispatcher treats as a configuration gap, not a
//! crash.

use crate::contact::Contact;
use crate::context::{keys, EvaluationContext};
use crate::events::{DomainEvent, TriggerKind};
use crate::identifiers::ContactId;
use std::collections::HashMap;
use std::sync::Arc;

/// Lead-score award for opening a campaign email
const OPEN_SCORE_AWARD: i64 = 2;
/// Lead-score award for clicking a campaign link; clicks outrank opens
const CLICK_SCORE_AWARD: i64 = 3;

/// Strategy for one event kind
pub trait TriggerHandler: Send + Sync {
    /// The event kind this handler supports
    fn trigger_kind(&self) -> TriggerKind;

    /// The subject contact of the event
    fn contact_id(&self, event: &DomainEvent) -> ContactId {
        event.contact_id()
    }

    /// Build the evaluation context for the event; pure
    fn build_context(&self, event: &DomainEvent) -> EvaluationContext;

    /// Event-specific contact mutation applied after the contact is loaded
    /// and before any rule runs
    ///
    /// Must be idempotent-safe under redelivery; the dispatcher's
    /// duplicate-delivery guard backs this up.
    fn on_contact_loaded(&self, _contact: &mut Contact, _event: &DomainEvent) {}
}

fn base_context(event: &DomainEvent) -> EvaluationContext {
    let email = match event {
        DomainEvent::ContactCreated { email, .. } => email.clone(),
        DomainEvent::ContactTagAdded { contact_email, .. }
        | DomainEvent::EmailOpened { contact_email, .. }
        | DomainEvent::EmailClicked { contact_email, .. }
        | DomainEvent::ContactListJoined { contact_email, .. } => contact_email.clone(),
    };
    EvaluationContext::new()
        .with(keys::CONTACT_EMAIL, email)
        .with(keys::EVENT_TIME, event.occurred_at().to_rfc3339())
}

/// Handler for [`TriggerKind::ContactCreated`]
#[derive(Debug, Default)]
pub struct ContactCreatedHandler;

impl TriggerHandler for ContactCreatedHandler {
    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::ContactCreated
    }

    fn build_context(&self, event: &DomainEvent) -> EvaluationContext {
        let mut ctx = base_context(event);
        if let DomainEvent::ContactCreated {
            first_name,
            last_name,
            ..
        } = event
        {
            ctx.set("firstName", first_name.clone());
            ctx.set("lastName", last_name.clone());
        }
        ctx
    }
}

/// Handler for [`TriggerKind::ContactTagAdded`]
#[derive(Debug, Default)]
pub struct TagAddedHandler;

impl TriggerHandler for TagAddedHandler {
    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::ContactTagAdded
    }

    fn build_context(&self, event: &DomainEvent) -> EvaluationContext {
        let mut ctx = base_context(event);
        if let DomainEvent::ContactTagAdded { tag_name, .. } = event {
            ctx.set(keys::TAG_ADDED, tag_name.clone());
        }
        ctx
    }

    fn on_contact_loaded(&self, contact: &mut Contact, event: &DomainEvent) {
        contact.touch_activity(event.occurred_at());
    }
}

/// Handler for [`TriggerKind::EmailOpened`]
///
/// Awards engagement points before rule evaluation, so a rule guarding on
/// lead score sees the post-award value.
#[derive(Debug, Default)]
pub struct EmailOpenedHandler;

impl TriggerHandler for EmailOpenedHandler {
    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::EmailOpened
    }

    fn build_context(&self, event: &DomainEvent) -> EvaluationContext {
        let mut ctx = base_context(event);
        if let DomainEvent::EmailOpened {
            campaign_id,
            message_id,
            ..
        } = event
        {
            ctx.set(keys::CAMPAIGN_ID, campaign_id.to_string());
            ctx.set(keys::MESSAGE_ID, message_id.to_string());
        }
        ctx.set(keys::EMAIL_OPENED, true);
        ctx
    }

    fn on_contact_loaded(&self, contact: &mut Contact, event: &DomainEvent) {
        contact.adjust_lead_score(OPEN_SCORE_AWARD);
        contact.touch_activity(event.occurred_at());
    }
}

/// Handler for [`TriggerKind::EmailClicked`]
#[derive(Debug, Default)]
pub struct EmailClickedHandler;

impl TriggerHandler for EmailClickedHandler {
    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::EmailClicked
    }

    fn build_context(&self, event: &DomainEvent) -> EvaluationContext {
        let mut ctx = base_context(event);
        if let DomainEvent::EmailClicked {
            campaign_id,
            message_id,
            clicked_url,
            ..
        } = event
        {
            ctx.set(keys::CAMPAIGN_ID, campaign_id.to_string());
            ctx.set(keys::MESSAGE_ID, message_id.to_string());
            ctx.set(keys::CLICKED_URL, clicked_url.clone());
        }
        ctx.set(keys::EMAIL_CLICKED, true);
        ctx
    }

    fn on_contact_loaded(&self, contact: &mut Contact, event: &DomainEvent) {
        contact.adjust_lead_score(CLICK_SCORE_AWARD);
        contact.touch_activity(event.occurred_at());
    }
}

/// Handler for [`TriggerKind::ContactListJoined`]
#[derive(Debug, Default)]
pub struct ListJoinedHandler;

impl TriggerHandler for ListJoinedHandler {
    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::ContactListJoined
    }

    fn build_context(&self, event: &DomainEvent) -> EvaluationContext {
        let mut ctx = base_context(event);
        if let DomainEvent::ContactListJoined {
            list_id, list_name, ..
        } = event
        {
            ctx.set(keys::LIST_ID, list_id.to_string());
            ctx.set(keys::LIST_NAME, list_name.clone());
        }
        ctx
    }

    fn on_contact_loaded(&self, contact: &mut Contact, event: &DomainEvent) {
        contact.touch_activity(event.occurred_at());
    }
}

/// Registry mapping trigger kinds to their handlers
///
/// Built once at process startup and injected into the dispatcher.
pub struct HandlerRegistry {
    handlers: HashMap<TriggerKind, Arc<dyn TriggerHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with all built-in handlers registered
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        let handlers: [Arc<dyn TriggerHandler>; 5] = [
            Arc::new(ContactCreatedHandler),
            Arc::new(TagAddedHandler),
            Arc::new(EmailOpenedHandler),
            Arc::new(EmailClickedHandler),
            Arc::new(ListJoinedHandler),
        ];
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler under the kind it declares support for
    ///
    /// A later registration for the same kind replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn TriggerHandler>) {
        self.handlers.insert(handler.trigger_kind(), handler);
    }

    /// The handler for a kind, or `None` when unregistered
    pub fn resolve(&self, kind: TriggerKind) -> Option<Arc<dyn TriggerHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}
