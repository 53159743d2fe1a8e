// Copyright 2025 Cowboy AI, LLC.

//! Action execution
//!
//! The executor applies one branch of a rule to a contact, in strict list
//! order. Actions are independent side effects, not a transaction: a
//! failed action is logged with rule id, contact id, and action type, and
//! the remaining actions of the branch still run. Any action with
//! `delay_minutes > 0`, and everything after a WAIT, is deferred through
//! the delayed-job scheduler instead of running inline.

use crate::contact::Contact;
use crate::context::EvaluationContext;
use crate::errors::{AutomationError, AutomationResult};
use crate::identifiers::JobId;
use crate::ports::{
    DelayedJobScheduler, ListService, MailGateway, OutboundEmail, ScheduledActionJob,
    WebhookGateway,
};
use crate::rule::{Action, ActionType, AutomationRule, Branch};
use chrono::{Duration, Utc};
use indexmap::IndexMap;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// One failed action within a branch
#[derive(Debug, Clone)]
pub struct ActionFailure {
    /// Index of the action in its branch
    pub index: usize,
    /// The action type that failed
    pub action_type: ActionType,
    /// Error message
    pub message: String,
}

/// Outcome of running one branch
///
/// A branch with failures is still "executed with partial failure"; no
/// rollback happens.
#[derive(Debug, Clone, Default)]
pub struct BranchReport {
    /// Actions that ran inline
    pub executed: usize,
    /// Actions handed to the delayed-job scheduler
    pub deferred: usize,
    /// Actions that failed
    pub failures: Vec<ActionFailure>,
}

impl BranchReport {
    /// Whether every action ran or was deferred without failure
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies rule actions to a contact and its event context
pub struct ActionExecutor {
    mail: Arc<dyn MailGateway>,
    lists: Arc<dyn ListService>,
    scheduler: Arc<dyn DelayedJobScheduler>,
    webhooks: Arc<dyn WebhookGateway>,
}

impl ActionExecutor {
    /// Create an executor over the four collaborator ports
    pub fn new(
        mail: Arc<dyn MailGateway>,
        lists: Arc<dyn ListService>,
        scheduler: Arc<dyn DelayedJobScheduler>,
        webhooks: Arc<dyn WebhookGateway>,
    ) -> Self {
        Self {
            mail,
            lists,
            scheduler,
            webhooks,
        }
    }

    /// Run a branch from the top, honoring delays and WAIT deferral
    pub async fn run_branch(
        &self,
        rule: &AutomationRule,
        contact: &mut Contact,
        ctx: &EvaluationContext,
        branch: Branch,
    ) -> BranchReport {
        self.run_from(rule, contact, ctx, branch, 0, true, false).await
    }

    /// Resume a branch from a scheduled job
    ///
    /// `only_one` runs just the action at `start` with its delay ignored
    /// (it already waited in the queue). Otherwise execution continues to
    /// the end of the branch, and a later WAIT or per-action delay defers
    /// again relative to now.
    pub async fn run_resumed(
        &self,
        rule: &AutomationRule,
        contact: &mut Contact,
        ctx: &EvaluationContext,
        branch: Branch,
        start: usize,
        only_one: bool,
    ) -> BranchReport {
        self.run_from(rule, contact, ctx, branch, start, !only_one, only_one)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_from(
        &self,
        rule: &AutomationRule,
        contact: &mut Contact,
        ctx: &EvaluationContext,
        branch: Branch,
        start: usize,
        honor_delays: bool,
        only_one: bool,
    ) -> BranchReport {
        let actions = rule.branch(branch);
        let mut report = BranchReport::default();

        let mut index = start;
        while index < actions.len() {
            let action = &actions[index];

            if honor_delays && action.action_type == ActionType::Wait {
                // WAIT defers the remaining actions of the branch as a
                // block; nothing after it runs inline.
                let minutes = wait_minutes(action);
                let remaining = actions.len().saturating_sub(index + 1);
                if remaining > 0 {
                    match self
                        .defer(rule, contact, ctx, branch, index + 1, true, minutes)
                        .await
                    {
                        Ok(()) => report.deferred += remaining,
                        Err(e) => {
                            // The deferred block must not run early, so it
                            // is lost rather than executed inline.
                            error!(
                                rule_id = %rule.id,
                                contact_id = %contact.id,
                                error = %e,
                                "failed to schedule WAIT continuation, dropping remaining actions"
                            );
                            report.failures.push(ActionFailure {
                                index,
                                action_type: ActionType::Wait,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                break;
            }

            if honor_delays && action.delay_minutes > 0 {
                match self
                    .defer(
                        rule,
                        contact,
                        ctx,
                        branch,
                        index,
                        false,
                        action.delay_minutes,
                    )
                    .await
                {
                    Ok(()) => report.deferred += 1,
                    Err(e) => {
                        error!(
                            rule_id = %rule.id,
                            contact_id = %contact.id,
                            action_type = ?action.action_type,
                            error = %e,
                            "failed to schedule delayed action"
                        );
                        report.failures.push(ActionFailure {
                            index,
                            action_type: action.action_type,
                            message: e.to_string(),
                        });
                    }
                }
            } else {
                match self.execute_action(rule, contact, ctx, action).await {
                    Ok(()) => {
                        debug!(
                            rule_id = %rule.id,
                            contact_id = %contact.id,
                            action_type = ?action.action_type,
                            "action executed"
                        );
                        report.executed += 1;
                    }
                    Err(e) => {
                        error!(
                            rule_id = %rule.id,
                            contact_id = %contact.id,
                            action_type = ?action.action_type,
                            error = %e,
                            "action failed, continuing with remaining actions"
                        );
                        report.failures.push(ActionFailure {
                            index,
                            action_type: action.action_type,
                            message: e.to_string(),
                        });
                    }
                }
            }

            if only_one {
                break;
            }
            index += 1;
        }

        report
    }

    async fn defer(
        &self,
        rule: &AutomationRule,
        contact: &Contact,
        ctx: &EvaluationContext,
        branch: Branch,
        action_index: usize,
        resume_remaining: bool,
        minutes: u32,
    ) -> AutomationResult<()> {
        let job = ScheduledActionJob {
            job_id: JobId::new(),
            tenant_id: contact.tenant_id,
            rule_id: rule.id,
            contact_id: contact.id,
            branch,
            action_index,
            resume_remaining,
            context: ctx.clone(),
        };
        let run_at = Utc::now() + Duration::minutes(i64::from(minutes));
        self.scheduler.schedule(job, run_at).await
    }

    /// Apply a single action inline
    async fn execute_action(
        &self,
        rule: &AutomationRule,
        contact: &mut Contact,
        ctx: &EvaluationContext,
        action: &Action,
    ) -> AutomationResult<()> {
        match action.action_type {
            ActionType::SendEmail => {
                let email = OutboundEmail {
                    template: action.value.clone(),
                    to: contact.email.clone(),
                    contact_id: contact.id,
                    substitutions: substitutions_for(contact, ctx),
                };
                self.mail
                    .send(&email)
                    .await
                    .map_err(|e| self.action_failed(rule, contact, action, e))
            }
            ActionType::AddTag => {
                contact.add_tag(&action.value);
                Ok(())
            }
            ActionType::RemoveTag => {
                contact.remove_tag(&action.value);
                Ok(())
            }
            ActionType::MoveToList => {
                let membership = self
                    .lists
                    .add_to_list(&action.value, contact.id)
                    .await
                    .map_err(|e| self.action_failed(rule, contact, action, e))?;
                contact.join_list(membership.list_id, membership.list_name);
                Ok(())
            }
            ActionType::RemoveFromList => {
                let removed = self
                    .lists
                    .remove_from_list(&action.value, contact.id)
                    .await
                    .map_err(|e| self.action_failed(rule, contact, action, e))?;
                if let Some(list_id) = removed {
                    contact.leave_list(&list_id);
                }
                Ok(())
            }
            ActionType::UpdateLeadScore => {
                let delta: i64 = action.value.trim().parse().map_err(|_| {
                    AutomationError::ActionFailed {
                        rule_id: rule.id,
                        contact_id: contact.id,
                        action_type: action.action_type,
                        message: format!("lead score delta is not an integer: '{}'", action.value),
                    }
                })?;
                contact.adjust_lead_score(delta);
                Ok(())
            }
            ActionType::Wait => {
                // Reached only during resumption or with a zero-minute
                // wait; nothing to do inline.
                Ok(())
            }
            ActionType::Webhook | ActionType::CustomAction => {
                let payload = json!({
                    "ruleId": rule.id,
                    "contactId": contact.id,
                    "contactEmail": contact.email,
                    "context": ctx,
                    "params": action.params,
                });
                self.webhooks
                    .invoke(&action.value, payload)
                    .await
                    .map_err(|e| self.action_failed(rule, contact, action, e))
            }
        }
    }

    fn action_failed(
        &self,
        rule: &AutomationRule,
        contact: &Contact,
        action: &Action,
        cause: AutomationError,
    ) -> AutomationError {
        AutomationError::ActionFailed {
            rule_id: rule.id,
            contact_id: contact.id,
            action_type: action.action_type,
            message: cause.to_string(),
        }
    }
}

/// Template substitutions from contact fields plus the event context
fn substitutions_for(contact: &Contact, ctx: &EvaluationContext) -> IndexMap<String, String> {
    let mut subs = IndexMap::new();
    subs.insert("firstName".to_string(), contact.first_name.clone());
    subs.insert("lastName".to_string(), contact.last_name.clone());
    subs.insert("fullName".to_string(), contact.full_name());
    subs.insert("email".to_string(), contact.email.clone());
    subs.insert("leadScore".to_string(), contact.lead_score.to_string());
    for (key, _) in ctx.iter() {
        if let Some(value) = ctx.get_string(key) {
            subs.insert(key.clone(), value);
        }
    }
    subs
}

/// Wait duration of a WAIT action: its delay, or its value parsed as minutes
fn wait_minutes(action: &Action) -> u32 {
    if action.delay_minutes > 0 {
        action.delay_minutes
    } else {
        action.value.trim().parse().unwrap_or_else(|_| {
            warn!(value = %action.value, "WAIT duration not parseable, deferring by zero minutes");
            0
        })
    }
}
