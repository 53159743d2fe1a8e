// Copyright 2025 Cowboy AI, LLC.

//! Collaborator contracts consumed by the pipeline
//!
//! The engine owns no persistence, mail delivery, or job queue of its own;
//! it talks to each of those through the ports below. In-memory reference
//! implementations ship alongside the traits for tests and for embedding
//! the pipeline without external infrastructure.

use crate::contact::{Contact, ListMembership};
use crate::context::EvaluationContext;
use crate::errors::AutomationResult;
use crate::events::TriggerKind;
use crate::identifiers::{ContactId, JobId, ListId, RuleId, TenantId};
use crate::rule::{AutomationRule, Branch};
use crate::tenant::TenantContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tokio::sync::RwLock;

/// Lookup of automation rules, scoped by tenant
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules for a tenant and trigger kind, in store order
    async fn find_active_by_tenant_and_trigger(
        &self,
        scope: &TenantContext,
        trigger: TriggerKind,
    ) -> AutomationResult<Vec<AutomationRule>>;

    /// A single rule by id, active or not
    async fn find_by_id(
        &self,
        scope: &TenantContext,
        id: RuleId,
    ) -> AutomationResult<Option<AutomationRule>>;
}

/// Lookup and persistence of contacts, scoped by tenant
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// A contact by id, or `None` when absent or owned by another tenant
    async fn find_by_id(
        &self,
        scope: &TenantContext,
        id: ContactId,
    ) -> AutomationResult<Option<Contact>>;

    /// Persist contact mutations
    ///
    /// Saved under the backing store's normal optimistic-concurrency rules
    /// (last-write-wins here); concurrent workers mutating the same contact
    /// are a documented lost-update hazard.
    async fn save(&self, scope: &TenantContext, contact: &Contact) -> AutomationResult<()>;
}

/// A rendered outbound email handed to the mail gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutboundEmail {
    /// Name of the template to resolve and render
    pub template: String,
    /// Recipient address
    pub to: String,
    /// Recipient contact id
    pub contact_id: ContactId,
    /// Template substitutions built from contact and event context
    pub substitutions: IndexMap<String, String>,
}

/// Outbound transactional/marketing email delivery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailGateway: Send + Sync {
    /// Resolve the template, render, and send
    async fn send(&self, email: &OutboundEmail) -> AutomationResult<()>;
}

/// List membership management
///
/// The list reference is a string because rule actions carry either a list
/// id or a list name; the service resolves it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListService: Send + Sync {
    /// Add the contact to the list, returning the resolved membership
    async fn add_to_list(
        &self,
        list: &str,
        contact_id: ContactId,
    ) -> AutomationResult<ListMembership>;

    /// Remove the contact from the list, returning the resolved list id if
    /// the list exists
    async fn remove_from_list(
        &self,
        list: &str,
        contact_id: ContactId,
    ) -> AutomationResult<Option<ListId>>;
}

/// External HTTP/callback invocation for webhook and custom actions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookGateway: Send + Sync {
    /// Invoke the target with a JSON payload; best effort
    async fn invoke(&self, target: &str, payload: serde_json::Value) -> AutomationResult<()>;
}

/// Payload of a deferred action, carried through the durable job queue
///
/// Serializable end to end: the queue persists it and hands it back for
/// [`crate::engine::AutomationEngine::execute_scheduled`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScheduledActionJob {
    /// Job id
    pub job_id: JobId,
    /// Tenant scope to restore when the job runs
    pub tenant_id: TenantId,
    /// Rule whose branch contains the deferred action(s)
    pub rule_id: RuleId,
    /// Contact the action(s) apply to
    pub contact_id: ContactId,
    /// Which branch of the rule
    pub branch: Branch,
    /// Index into the branch's action list
    pub action_index: usize,
    /// `false`: run only the action at `action_index` (a per-action delay);
    /// `true`: run from `action_index` to the end of the branch (a WAIT)
    pub resume_remaining: bool,
    /// Snapshot of the evaluation context of the deferring event
    pub context: EvaluationContext,
}

/// Durable delayed-job queue, at-least-once delivery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DelayedJobScheduler: Send + Sync {
    /// Enqueue a job for execution at `run_at`
    async fn schedule(&self, job: ScheduledActionJob, run_at: DateTime<Utc>)
        -> AutomationResult<()>;
}

/// In-memory rule store
pub struct InMemoryRuleStore {
    rules: RwLock<Vec<AutomationRule>>,
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Insert a rule
    pub async fn insert(&self, rule: AutomationRule) {
        self.rules.write().await.push(rule);
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_active_by_tenant_and_trigger(
        &self,
        scope: &TenantContext,
        trigger: TriggerKind,
    ) -> AutomationResult<Vec<AutomationRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.is_active && r.trigger() == trigger && scope.can_access(&r.tenant_id))
            .cloned()
            .collect())
    }

    async fn find_by_id(
        &self,
        scope: &TenantContext,
        id: RuleId,
    ) -> AutomationResult<Option<AutomationRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .find(|r| r.id == id && scope.can_access(&r.tenant_id))
            .cloned())
    }
}

/// In-memory contact store, last-write-wins on save
pub struct InMemoryContactStore {
    contacts: RwLock<HashMap<ContactId, Contact>>,
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            contacts: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a contact, bypassing tenant checks (test/bootstrap seam)
    pub async fn insert(&self, contact: Contact) {
        self.contacts.write().await.insert(contact.id, contact);
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn find_by_id(
        &self,
        scope: &TenantContext,
        id: ContactId,
    ) -> AutomationResult<Option<Contact>> {
        Ok(self
            .contacts
            .read()
            .await
            .get(&id)
            .filter(|c| scope.can_access(&c.tenant_id))
            .cloned())
    }

    async fn save(&self, scope: &TenantContext, contact: &Contact) -> AutomationResult<()> {
        if !scope.can_access(&contact.tenant_id) {
            return Err(crate::errors::AutomationError::StoreError(format!(
                "save of contact {} rejected under scope {scope}",
                contact.id
            )));
        }
        self.contacts
            .write()
            .await
            .insert(contact.id, contact.clone());
        Ok(())
    }
}

/// Entry in the in-memory job queue, ordered by run-at time
#[derive(Debug, Clone)]
struct QueuedJob {
    run_at: DateTime<Utc>,
    seq: u64,
    job: ScheduledActionJob,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want earliest run_at first.
        other
            .run_at
            .cmp(&self.run_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// In-memory time-ordered delayed-job queue
///
/// Reference implementation of the scheduler port: a priority structure
/// keyed by run-at. A production deployment substitutes a durable queue
/// with at-least-once delivery behind the same trait.
pub struct InMemoryJobQueue {
    heap: RwLock<(BinaryHeap<QueuedJob>, u64)>,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            heap: RwLock::new((BinaryHeap::new(), 0)),
        }
    }

    /// Number of queued jobs
    pub async fn len(&self) -> usize {
        self.heap.read().await.0.len()
    }

    /// Whether the queue is empty
    pub async fn is_empty(&self) -> bool {
        self.heap.read().await.0.is_empty()
    }

    /// Remove and return all jobs due at or before `now`, earliest first
    pub async fn due(&self, now: DateTime<Utc>) -> Vec<ScheduledActionJob> {
        let mut guard = self.heap.write().await;
        let mut due = Vec::new();
        while let Some(head) = guard.0.peek() {
            if head.run_at > now {
                break;
            }
            due.push(guard.0.pop().map(|q| q.job).unwrap());
        }
        due
    }

    /// Peek the next run-at time without removing anything
    pub async fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.heap.read().await.0.peek().map(|q| q.run_at)
    }
}

#[async_trait]
impl DelayedJobScheduler for InMemoryJobQueue {
    async fn schedule(
        &self,
        job: ScheduledActionJob,
        run_at: DateTime<Utc>,
    ) -> AutomationResult<()> {
        let mut guard = self.heap.write().await;
        let seq = guard.1;
        guard.1 += 1;
        guard.0.push(QueuedJob { run_at, seq, job });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rule_for(tenant: TenantId, trigger: TriggerKind) -> AutomationRule {
        AutomationRule::new(tenant, "r", trigger)
    }

    fn job_for(tenant: TenantId) -> ScheduledActionJob {
        ScheduledActionJob {
            job_id: JobId::new(),
            tenant_id: tenant,
            rule_id: RuleId::new(),
            contact_id: ContactId::new(),
            branch: Branch::Then,
            action_index: 0,
            resume_remaining: false,
            context: EvaluationContext::new(),
        }
    }

    #[tokio::test]
    async fn rule_store_filters_by_tenant_trigger_and_active() {
        let store = InMemoryRuleStore::new();
        let ours = TenantId::new();
        let theirs = TenantId::new();

        store.insert(rule_for(ours, TriggerKind::EmailOpened)).await;
        store
            .insert(rule_for(ours, TriggerKind::EmailOpened).deactivated())
            .await;
        store
            .insert(rule_for(ours, TriggerKind::ContactCreated))
            .await;
        store
            .insert(rule_for(theirs, TriggerKind::EmailOpened))
            .await;

        let scope = TenantContext::scoped(ours);
        let found = store
            .find_active_by_tenant_and_trigger(&scope, TriggerKind::EmailOpened)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tenant_id, ours);
    }

    #[tokio::test]
    async fn contact_store_enforces_tenant_isolation() {
        let store = InMemoryContactStore::new();
        let ours = TenantId::new();
        let theirs = TenantId::new();
        let contact = Contact::new(ContactId::new(), ours, "a@b.c", "A", "B");
        store.insert(contact.clone()).await;

        let our_scope = TenantContext::scoped(ours);
        let their_scope = TenantContext::scoped(theirs);

        assert!(store
            .find_by_id(&our_scope, contact.id)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_id(&their_scope, contact.id)
            .await
            .unwrap()
            .is_none());

        // Cross-tenant save is rejected too
        assert!(store.save(&their_scope, &contact).await.is_err());
        assert!(store.save(&our_scope, &contact).await.is_ok());
    }

    #[tokio::test]
    async fn job_queue_releases_in_run_at_order() {
        let queue = InMemoryJobQueue::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        let late = job_for(tenant);
        let early = job_for(tenant);
        let future = job_for(tenant);
        queue
            .schedule(late.clone(), now + Duration::minutes(10))
            .await
            .unwrap();
        queue
            .schedule(early.clone(), now + Duration::minutes(1))
            .await
            .unwrap();
        queue
            .schedule(future.clone(), now + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(queue.len().await, 3);
        assert_eq!(queue.next_run_at().await, Some(now + Duration::minutes(1)));

        let due = queue.due(now + Duration::minutes(30)).await;
        let ids: Vec<JobId> = due.iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec![early.job_id, late.job_id]);

        // The far-future job stays queued
        assert_eq!(queue.len().await, 1);
        assert!(queue.due(now).await.is_empty());
    }

    #[tokio::test]
    async fn job_payload_roundtrips_through_json() {
        // The queue is durable, so the payload must survive serialization
        let job = job_for(TenantId::new());
        let json = serde_json::to_string(&job).unwrap();
        let back: ScheduledActionJob = serde_json::from_str(&json).unwrap();
        assert_eq!(job, back);
    }
}
