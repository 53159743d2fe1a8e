// Copyright 2025 Cowboy AI, LLC.

//! Asynchronous event dispatch
//!
//! Publishers hand events to the dispatcher synchronously; a bounded tokio
//! worker pool does the rest, so a slow mail gateway delays one worker,
//! never the publisher. The tenant context is captured at publish time,
//! carried inside the dispatch job, and exists on the worker only for the
//! lifetime of that job; there is no ambient state to clear and no way for
//! a tenant id to leak into the next job a worker picks up.
//!
//! Per-event and per-rule failure boundaries: a rule failure is logged and
//! its siblings still run; an event failure is logged and the next event
//! is unaffected; nothing propagates back to the publisher.

use crate::contact::Contact;
use crate::engine::AutomationEngine;
use crate::errors::{AutomationError, AutomationResult};
use crate::events::DomainEvent;
use crate::handlers::HandlerRegistry;
use crate::identifiers::{EventId, TenantId};
use crate::ports::{ContactStore, RuleStore};
use crate::tenant::TenantContext;
use futures::future::join_all;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What to do with an event that arrives without a tenant context
///
/// Capturing no tenant is a defect signal either way; the policy decides
/// whether the event is dropped or processed under the tenant of the
/// contact it targets. A deployment choice, not hard-coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTenantPolicy {
    /// Drop the event; logged at error level
    #[default]
    Drop,
    /// Load the contact unscoped and adopt its tenant id; logged at warn
    /// level
    ProceedUnscoped,
}

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Bound of the intake queue
    pub queue_depth: usize,
    /// Capacity of the duplicate-delivery LRU guard
    pub dedup_capacity: usize,
    /// Policy for events without a tenant context
    pub missing_tenant_policy: MissingTenantPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 256,
            dedup_capacity: 4096,
            missing_tenant_policy: MissingTenantPolicy::default(),
        }
    }
}

/// Why an event was dropped before processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No tenant context and the policy is [`MissingTenantPolicy::Drop`]
    MissingTenant,
    /// The event id was already processed recently
    Duplicate,
}

/// Why an event's handling failed before rule evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No handler registered for the event's kind (configuration gap)
    NoHandler,
    /// The subject contact does not exist under the event's tenant scope
    ContactNotFound,
    /// A store collaborator failed
    Store(String),
}

/// Terminal state of one event's handling
///
/// Individual rule failures do not turn a Completed into a Failed; they
/// are counted and logged inside their own boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler resolved and every matching rule was attempted
    Completed {
        /// Rules attempted
        rules_attempted: usize,
        /// Rules whose invocation errored
        rules_failed: usize,
    },
    /// Handling aborted before rule evaluation
    Failed(FailureReason),
    /// Event was not processed at all
    Dropped(DropReason),
}

/// Per-event processing, independent of the worker pool
///
/// Owns the handler registry, the stores, the engine, the duplicate
/// guard, and the missing-tenant policy. The dispatcher wraps this in
/// workers; tests can call [`EventPipeline::process`] directly.
pub struct EventPipeline {
    registry: Arc<HandlerRegistry>,
    rules: Arc<dyn RuleStore>,
    contacts: Arc<dyn ContactStore>,
    engine: AutomationEngine,
    seen: Mutex<LruCache<EventId, ()>>,
    policy: MissingTenantPolicy,
}

impl EventPipeline {
    /// Create a pipeline
    pub fn new(
        registry: Arc<HandlerRegistry>,
        rules: Arc<dyn RuleStore>,
        contacts: Arc<dyn ContactStore>,
        engine: AutomationEngine,
        config: &DispatcherConfig,
    ) -> Self {
        let capacity = NonZeroUsize::new(config.dedup_capacity.max(1)).unwrap();
        Self {
            registry,
            rules,
            contacts,
            engine,
            seen: Mutex::new(LruCache::new(capacity)),
            policy: config.missing_tenant_policy,
        }
    }

    /// Handle one event to a terminal state
    pub async fn process(&self, tenant: Option<TenantId>, event: &DomainEvent) -> DispatchOutcome {
        let event_id = event.event_id();
        let kind = event.kind();

        let mut scope = match tenant {
            Some(tenant) => TenantContext::scoped(tenant),
            None => match self.policy {
                MissingTenantPolicy::Drop => {
                    error!(
                        %event_id,
                        %kind,
                        "event delivered without tenant context, dropping"
                    );
                    return DispatchOutcome::Dropped(DropReason::MissingTenant);
                }
                MissingTenantPolicy::ProceedUnscoped => {
                    warn!(
                        %event_id,
                        %kind,
                        "event delivered without tenant context, proceeding unscoped"
                    );
                    TenantContext::unscoped()
                }
            },
        };

        let Some(handler) = self.registry.resolve(kind) else {
            warn!(%event_id, %kind, "no handler registered for event kind, dropping event");
            return DispatchOutcome::Failed(FailureReason::NoHandler);
        };

        let contact_id = handler.contact_id(event);
        let mut contact: Contact = match self.contacts.find_by_id(&scope, contact_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                warn!(%event_id, %contact_id, scope = %scope, "contact not found for event");
                return DispatchOutcome::Failed(FailureReason::ContactNotFound);
            }
            Err(e) => {
                error!(%event_id, %contact_id, error = %e, "contact lookup failed");
                return DispatchOutcome::Failed(FailureReason::Store(e.to_string()));
            }
        };

        // Unscoped processing adopts the ownership of the contact it
        // actually loaded, so rule lookup stays tenant-bounded.
        if !scope.is_scoped() {
            scope = TenantContext::scoped(contact.tenant_id);
        }

        // Record the event id only now that handler and contact resolved:
        // a drop or failure above must not poison the cache for a later
        // redelivery that would succeed (e.g. the contact exists by then).
        // Past this point the hook and rules mutate state, which is what
        // the guard protects against double-applying.
        if self.seen.lock().await.put(event_id, ()).is_some() {
            warn!(%event_id, %kind, "duplicate event delivery, dropping");
            return DispatchOutcome::Dropped(DropReason::Duplicate);
        }

        let ctx = handler.build_context(event);
        handler.on_contact_loaded(&mut contact, event);
        // Persist hook mutations (engagement awards) even when no rule
        // matches this trigger.
        if let Err(e) = self.contacts.save(&scope, &contact).await {
            error!(%event_id, %contact_id, error = %e, "failed to persist contact hook mutations");
            return DispatchOutcome::Failed(FailureReason::Store(e.to_string()));
        }

        let rules = match self
            .rules
            .find_active_by_tenant_and_trigger(&scope, kind)
            .await
        {
            Ok(rules) => rules,
            Err(e) => {
                error!(%event_id, %kind, error = %e, "rule lookup failed");
                return DispatchOutcome::Failed(FailureReason::Store(e.to_string()));
            }
        };

        let mut rules_failed = 0;
        let rules_attempted = rules.len();
        for rule in &rules {
            // Per-rule failure boundary: one rule's error must not block
            // its siblings.
            match self.engine.execute_rule(&scope, rule, &mut contact, &ctx).await {
                Ok(outcome) => {
                    debug!(
                        %event_id,
                        rule_name = %rule.name,
                        contact_id = %contact.id,
                        branch = ?outcome.branch(),
                        "rule executed"
                    );
                }
                Err(e) => {
                    rules_failed += 1;
                    error!(
                        %event_id,
                        rule_name = %rule.name,
                        contact_id = %contact.id,
                        error = %e,
                        "rule execution failed, continuing with remaining rules"
                    );
                }
            }
        }

        DispatchOutcome::Completed {
            rules_attempted,
            rules_failed,
        }
    }
}

struct DispatchJob {
    tenant: Option<TenantId>,
    event: DomainEvent,
}

/// Bounded worker pool in front of an [`EventPipeline`]
pub struct EventDispatcher {
    tx: mpsc::Sender<DispatchJob>,
    workers: Vec<JoinHandle<()>>,
}

impl EventDispatcher {
    /// Start the worker pool
    pub fn start(pipeline: Arc<EventPipeline>, config: &DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel::<DispatchJob>(config.queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let worker_count = config.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let rx = rx.clone();
            let pipeline = pipeline.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only for the hand-off; the
                    // event is processed after the guard is dropped so
                    // workers run concurrently.
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else {
                        debug!(worker, "dispatch worker shutting down");
                        break;
                    };
                    let event_id = job.event.event_id();
                    let kind = job.event.kind();
                    match pipeline.process(job.tenant, &job.event).await {
                        DispatchOutcome::Completed {
                            rules_attempted,
                            rules_failed,
                        } => {
                            debug!(
                                worker,
                                %event_id,
                                %kind,
                                rules_attempted,
                                rules_failed,
                                "event completed"
                            );
                        }
                        DispatchOutcome::Failed(reason) => {
                            warn!(worker, %event_id, %kind, ?reason, "event failed");
                        }
                        DispatchOutcome::Dropped(reason) => {
                            warn!(worker, %event_id, %kind, ?reason, "event dropped");
                        }
                    }
                }
            }));
        }
        info!(workers = worker_count, queue_depth = config.queue_depth, "event dispatcher started");

        Self { tx, workers }
    }

    /// Publish an event under the caller's tenant context
    ///
    /// Captures the tenant id into the dispatch job; awaits only for queue
    /// capacity, never for rule evaluation.
    pub async fn publish(
        &self,
        ctx: &TenantContext,
        event: DomainEvent,
    ) -> AutomationResult<()> {
        if !ctx.is_scoped() {
            // Defect signal at the capture point; the policy decides the
            // event's fate on the worker side.
            warn!(event_id = %event.event_id(), "publishing event without tenant context");
        }
        self.tx
            .send(DispatchJob {
                tenant: ctx.tenant_id().copied(),
                event,
            })
            .await
            .map_err(|_| AutomationError::DispatcherClosed)
    }

    /// Publish without waiting; fails fast when the queue is full
    pub fn try_publish(&self, ctx: &TenantContext, event: DomainEvent) -> AutomationResult<()> {
        if !ctx.is_scoped() {
            warn!(event_id = %event.event_id(), "publishing event without tenant context");
        }
        self.tx
            .try_send(DispatchJob {
                tenant: ctx.tenant_id().copied(),
                event,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => AutomationError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => AutomationError::DispatcherClosed,
            })
    }

    /// Close the intake and wait for workers to drain the queue
    pub async fn shutdown(self) {
        drop(self.tx);
        join_all(self.workers).await;
        info!("event dispatcher stopped");
    }
}
