//! # Automation Engine
//!
//! Automation rule engine and event-dispatch pipeline for a multi-tenant
//! marketing platform.
//!
//! The crate is the reactive core of the platform: domain events (contact
//! created, tag added, email opened/clicked, list joined) are matched
//! against tenant-scoped automation rules, rule conditions are evaluated
//! against the contact and the event's context, and the resulting actions
//! run (send email, mutate the contact, wait, webhook). Everything around
//! it - persistence, mail delivery, HTTP, billing - stays behind
//! collaborator ports.
//!
//! ## Design Principles
//!
//! 1. **Explicit tenancy**: every store access takes a [`TenantContext`];
//!    the tenant id is captured into each dispatch job and scoped to it,
//!    never held in ambient thread-local state
//! 2. **Closed dispatch**: events are a tagged union and handlers live in
//!    a registry built once at startup; no reflection
//! 3. **Failure isolation**: per-event, per-rule, and per-action
//!    boundaries catch, log, and continue; nothing propagates to the
//!    publisher
//! 4. **Fail-closed evaluation**: a condition over missing or malformed
//!    data is `false`, never an error
//! 5. **Deferral over blocking**: delayed actions go through a durable
//!    job-queue port; workers never sleep on business time

#![warn(missing_docs)]

mod contact;
mod context;
mod dispatcher;
mod engine;
mod errors;
mod evaluator;
mod events;
mod executor;
mod handlers;
mod identifiers;
mod ports;
mod rule;
mod tenant;

// Re-export core types
pub use contact::{Contact, ListMembership};
pub use context::{keys, EvaluationContext};
pub use dispatcher::{
    DispatchOutcome, DispatcherConfig, DropReason, EventDispatcher, EventPipeline, FailureReason,
    MissingTenantPolicy,
};
pub use engine::{AutomationEngine, RuleOutcome};
pub use errors::{AutomationError, AutomationResult};
pub use evaluator::{evaluate, evaluate_all};
pub use events::{DomainEvent, TriggerKind};
pub use executor::{ActionExecutor, ActionFailure, BranchReport};
pub use handlers::{
    ContactCreatedHandler, EmailClickedHandler, EmailOpenedHandler, HandlerRegistry,
    ListJoinedHandler, TagAddedHandler, TriggerHandler,
};
pub use identifiers::{ContactId, EventId, JobId, ListId, RuleId, TenantId};
pub use ports::{
    ContactStore, DelayedJobScheduler, InMemoryContactStore, InMemoryJobQueue, InMemoryRuleStore,
    ListService, MailGateway, OutboundEmail, RuleStore, ScheduledActionJob, WebhookGateway,
};
pub use rule::{
    Action, ActionType, AutomationRule, Branch, Condition, ConditionOperator, ConditionValueType,
};
pub use tenant::TenantContext;
