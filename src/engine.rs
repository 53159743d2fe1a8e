// Copyright 2025 Cowboy AI, LLC.

//! Automation engine
//!
//! Orchestrates one rule against one contact: evaluate the conditions,
//! run the matching branch through the [`ActionExecutor`], persist the
//! contact's mutations. Each invocation is independent; the caller owns
//! the per-rule failure boundary.
//!
//! [`AutomationEngine::execute_rule`] is also the entry point for manual,
//! on-demand rule execution ("run this rule for this contact now"),
//! bypassing the event pipeline but reusing the same evaluation and action
//! code.

use crate::contact::Contact;
use crate::context::EvaluationContext;
use crate::errors::{AutomationError, AutomationResult};
use crate::evaluator;
use crate::executor::{ActionExecutor, BranchReport};
use crate::identifiers::{ContactId, RuleId};
use crate::ports::{ContactStore, RuleStore, ScheduledActionJob};
use crate::rule::{AutomationRule, Branch};
use crate::tenant::TenantContext;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one rule invocation
#[derive(Debug, Clone)]
pub enum RuleOutcome {
    /// The rule is inactive and was not evaluated
    Skipped,
    /// A branch was selected and executed
    Executed {
        /// Which branch the conditions selected
        branch: Branch,
        /// What happened to the branch's actions
        report: BranchReport,
    },
}

impl RuleOutcome {
    /// The selected branch, if the rule was evaluated
    pub fn branch(&self) -> Option<Branch> {
        match self {
            RuleOutcome::Skipped => None,
            RuleOutcome::Executed { branch, .. } => Some(*branch),
        }
    }
}

/// The rule orchestrator
pub struct AutomationEngine {
    executor: ActionExecutor,
    rules: Arc<dyn RuleStore>,
    contacts: Arc<dyn ContactStore>,
}

impl AutomationEngine {
    /// Create an engine over the executor and the two stores
    pub fn new(
        executor: ActionExecutor,
        rules: Arc<dyn RuleStore>,
        contacts: Arc<dyn ContactStore>,
    ) -> Self {
        Self {
            executor,
            rules,
            contacts,
        }
    }

    /// Execute one rule against a contact and its event context
    ///
    /// Evaluates all conditions (AND), runs the "then" branch on a match
    /// and the "else" branch otherwise, then persists the contact. The
    /// inactive check is defensive; callers are expected to have filtered
    /// already.
    pub async fn execute_rule(
        &self,
        scope: &TenantContext,
        rule: &AutomationRule,
        contact: &mut Contact,
        ctx: &EvaluationContext,
    ) -> AutomationResult<RuleOutcome> {
        if !rule.is_active {
            debug!(rule_id = %rule.id, rule_name = %rule.name, "rule inactive, skipping");
            return Ok(RuleOutcome::Skipped);
        }

        let matched = evaluator::evaluate_all(&rule.conditions, contact, ctx);
        let branch = if matched { Branch::Then } else { Branch::Else };
        debug!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            contact_id = %contact.id,
            ?branch,
            "conditions evaluated"
        );

        let report = self.executor.run_branch(rule, contact, ctx, branch).await;

        // Persist whatever the branch mutated, even on partial failure;
        // actions are not a transaction.
        self.contacts.save(scope, contact).await?;

        Ok(RuleOutcome::Executed { branch, report })
    }

    /// Load rule and contact by id and execute, for manual invocation
    pub async fn execute_rule_by_id(
        &self,
        scope: &TenantContext,
        rule_id: RuleId,
        contact_id: ContactId,
        ctx: &EvaluationContext,
    ) -> AutomationResult<RuleOutcome> {
        let rule = self
            .rules
            .find_by_id(scope, rule_id)
            .await?
            .ok_or(AutomationError::RuleNotFound(rule_id))?;
        let mut contact = self
            .contacts
            .find_by_id(scope, contact_id)
            .await?
            .ok_or(AutomationError::ContactNotFound(contact_id))?;
        self.execute_rule(scope, &rule, &mut contact, ctx).await
    }

    /// Execute a deferred action job delivered by the job queue
    ///
    /// Re-loads rule and contact under the job's tenant scope. A missing or
    /// deactivated rule, or a missing contact, discards the job with a
    /// warning; the queue is at-least-once and a stale job is not an error.
    pub async fn execute_scheduled(&self, job: &ScheduledActionJob) -> AutomationResult<()> {
        let scope = TenantContext::scoped(job.tenant_id);

        let Some(rule) = self.rules.find_by_id(&scope, job.rule_id).await? else {
            warn!(job_id = %job.job_id, rule_id = %job.rule_id, "scheduled job references missing rule, discarding");
            return Ok(());
        };
        if !rule.is_active {
            warn!(job_id = %job.job_id, rule_id = %rule.id, "scheduled job references deactivated rule, discarding");
            return Ok(());
        }
        let Some(mut contact) = self.contacts.find_by_id(&scope, job.contact_id).await? else {
            warn!(job_id = %job.job_id, contact_id = %job.contact_id, "scheduled job references missing contact, discarding");
            return Ok(());
        };

        let report = self
            .executor
            .run_resumed(
                &rule,
                &mut contact,
                &job.context,
                job.branch,
                job.action_index,
                !job.resume_remaining,
            )
            .await;
        if !report.is_clean() {
            warn!(
                job_id = %job.job_id,
                rule_id = %rule.id,
                failures = report.failures.len(),
                "scheduled job completed with failures"
            );
        }

        self.contacts.save(&scope, &contact).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TriggerKind;
    use crate::identifiers::{ContactId, TenantId};
    use crate::ports::{
        InMemoryContactStore, InMemoryJobQueue, InMemoryRuleStore, MockListService,
        MockMailGateway, MockWebhookGateway,
    };
    use crate::rule::{Action, ActionType, Condition, ConditionOperator};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    struct Fixture {
        engine: AutomationEngine,
        rules: Arc<InMemoryRuleStore>,
        contacts: Arc<InMemoryContactStore>,
        queue: Arc<InMemoryJobQueue>,
        tenant: TenantId,
    }

    fn executor_with_queue(queue: Arc<InMemoryJobQueue>) -> ActionExecutor {
        let mut mail = MockMailGateway::new();
        mail.expect_send().returning(|_| Ok(()));
        let mut webhooks = MockWebhookGateway::new();
        webhooks.expect_invoke().returning(|_, _| Ok(()));
        ActionExecutor::new(
            Arc::new(mail),
            Arc::new(MockListService::new()),
            queue,
            Arc::new(webhooks),
        )
    }

    fn fixture() -> Fixture {
        let rules = Arc::new(InMemoryRuleStore::new());
        let contacts = Arc::new(InMemoryContactStore::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let engine = AutomationEngine::new(
            executor_with_queue(queue.clone()),
            rules.clone(),
            contacts.clone(),
        );
        Fixture {
            engine,
            rules,
            contacts,
            queue,
            tenant: TenantId::new(),
        }
    }

    fn contact(tenant: TenantId) -> Contact {
        Contact::new(ContactId::new(), tenant, "ada@example.com", "Ada", "Lovelace")
    }

    #[tokio::test]
    async fn empty_condition_list_takes_then_branch() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "trigger-only", TriggerKind::ContactCreated)
            .with_action(Action::new(ActionType::AddTag, "New"));
        let mut c = contact(f.tenant);
        f.contacts.insert(c.clone()).await;

        let scope = TenantContext::scoped(f.tenant);
        let ctx = EvaluationContext::new();
        let outcome = f
            .engine
            .execute_rule(&scope, &rule, &mut c, &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.branch(), Some(Branch::Then));
        assert!(c.has_tag("New"));
    }

    #[tokio::test]
    async fn inactive_rule_is_skipped() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "off", TriggerKind::ContactCreated)
            .with_action(Action::new(ActionType::AddTag, "New"))
            .deactivated();
        let mut c = contact(f.tenant);

        let scope = TenantContext::scoped(f.tenant);
        let ctx = EvaluationContext::new();
        let outcome = f
            .engine
            .execute_rule(&scope, &rule, &mut c, &ctx)
            .await
            .unwrap();

        assert!(outcome.branch().is_none());
        assert!(!c.has_tag("New"));
    }

    #[tokio::test]
    async fn failing_condition_takes_else_branch() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "vip-or-cold", TriggerKind::ContactTagAdded)
            .with_condition(Condition::new("", ConditionOperator::HasTag, "Newsletter"))
            .with_action(Action::new(ActionType::SendEmail, "welcome-template"))
            .with_else_action(Action::new(ActionType::AddTag, "New Customer"));
        let mut c = contact(f.tenant);
        c.add_tag("Other");
        f.contacts.insert(c.clone()).await;

        let scope = TenantContext::scoped(f.tenant);
        let ctx = EvaluationContext::new();
        let outcome = f
            .engine
            .execute_rule(&scope, &rule, &mut c, &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.branch(), Some(Branch::Else));
        assert!(c.has_tag("New Customer"));
    }

    #[tokio::test]
    async fn contact_mutations_are_persisted_after_the_branch() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "score", TriggerKind::EmailOpened)
            .with_action(Action::new(ActionType::UpdateLeadScore, "10"));
        let mut c = contact(f.tenant);
        f.contacts.insert(c.clone()).await;

        let scope = TenantContext::scoped(f.tenant);
        f.engine
            .execute_rule(&scope, &rule, &mut c, &EvaluationContext::new())
            .await
            .unwrap();

        let stored = f
            .contacts
            .find_by_id(&scope, c.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.lead_score, 10);
    }

    #[tokio::test]
    async fn execute_rule_by_id_loads_and_runs() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "manual", TriggerKind::ContactCreated)
            .with_action(Action::new(ActionType::AddTag, "Manual"));
        let rule_id = rule.id;
        f.rules.insert(rule).await;
        let c = contact(f.tenant);
        let contact_id = c.id;
        f.contacts.insert(c).await;

        let scope = TenantContext::scoped(f.tenant);
        let outcome = f
            .engine
            .execute_rule_by_id(&scope, rule_id, contact_id, &EvaluationContext::new())
            .await
            .unwrap();
        assert_eq!(outcome.branch(), Some(Branch::Then));

        let stored = f
            .contacts
            .find_by_id(&scope, contact_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.has_tag("Manual"));

        let missing = f
            .engine
            .execute_rule_by_id(&scope, RuleId::new(), contact_id, &EvaluationContext::new())
            .await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn deferred_action_flows_through_queue_to_scheduled_execution() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "vip-later", TriggerKind::EmailOpened)
            .with_action(Action::new(ActionType::UpdateLeadScore, "10"))
            .with_action(Action::delayed(ActionType::AddTag, "VIP", 1440));
        f.rules.insert(rule.clone()).await;
        let mut c = contact(f.tenant);
        c.lead_score = 75;
        f.contacts.insert(c.clone()).await;

        let scope = TenantContext::scoped(f.tenant);
        f.engine
            .execute_rule(&scope, &rule, &mut c, &EvaluationContext::new())
            .await
            .unwrap();

        // Immediate effect applied, deferred effect queued
        assert_eq!(c.lead_score, 85);
        assert!(!c.has_tag("VIP"));
        assert_eq!(f.queue.len().await, 1);
        let next = f.queue.next_run_at().await.unwrap();
        assert!(next > Utc::now() + Duration::minutes(1439));

        // Drain the queue as if a day passed and run the job
        let due = f.queue.due(Utc::now() + Duration::minutes(1441)).await;
        assert_eq!(due.len(), 1);
        f.engine.execute_scheduled(&due[0]).await.unwrap();

        let stored = f
            .contacts
            .find_by_id(&scope, c.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.has_tag("VIP"));
        assert_eq!(stored.lead_score, 85);
    }

    #[tokio::test]
    async fn scheduled_job_for_deactivated_rule_is_discarded() {
        let f = fixture();
        let rule = AutomationRule::new(f.tenant, "gone", TriggerKind::EmailOpened)
            .with_action(Action::delayed(ActionType::AddTag, "VIP", 10))
            .deactivated();
        f.rules.insert(rule.clone()).await;
        let c = contact(f.tenant);
        f.contacts.insert(c.clone()).await;

        let job = ScheduledActionJob {
            job_id: crate::identifiers::JobId::new(),
            tenant_id: f.tenant,
            rule_id: rule.id,
            contact_id: c.id,
            branch: Branch::Then,
            action_index: 0,
            resume_remaining: false,
            context: EvaluationContext::new(),
        };
        f.engine.execute_scheduled(&job).await.unwrap();

        let scope = TenantContext::scoped(f.tenant);
        let stored = f
            .contacts
            .find_by_id(&scope, c.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.has_tag("VIP"));
    }
}
