// Copyright 2025 Cowboy AI, LLC.

//! Automation rule aggregate and its condition/action value objects
//!
//! A rule reacts to one trigger kind. Its conditions are AND-combined to
//! pick the "then" branch; any failing condition routes to the "else"
//! branch. Conditions and actions are value objects with no identity of
//! their own; the rule owns them in order.

use crate::events::TriggerKind;
use crate::identifiers::{RuleId, TenantId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Comparison operator of a [`Condition`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ConditionOperator {
    /// Field equals the comparison value
    Equals,
    /// Field does not equal the comparison value
    NotEquals,
    /// Field contains the comparison value as a substring
    Contains,
    /// Field does not contain the comparison value
    NotContains,
    /// Field is numerically (or lexicographically) greater
    GreaterThan,
    /// Field is numerically (or lexicographically) smaller
    LessThan,
    /// Contact carries the tag named by the comparison value
    HasTag,
    /// Contact does not carry the tag
    NotHasTag,
    /// Contact is a member of the list (by id or name)
    InList,
    /// Contact is not a member of the list
    NotInList,
    /// The current event is an email open
    EmailOpened,
    /// The current event is an email click
    EmailClicked,
}

/// Hint for how the comparison value should be interpreted
///
/// The evaluator attempts numeric comparison first regardless; this tag is
/// carried for the rule editor and for operators where the hint matters.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum ConditionValueType {
    /// Free text
    #[default]
    Text,
    /// Numeric value
    Number,
    /// Boolean value
    Boolean,
}

/// One condition of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    /// Contact field or evaluation-context key to read
    pub field: String,
    /// Comparison operator
    pub operator: ConditionOperator,
    /// Comparison value
    pub value: String,
    /// Interpretation hint for the comparison value
    #[serde(default)]
    pub value_type: ConditionValueType,
}

impl Condition {
    /// Create a condition with the default text value type
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value_type: ConditionValueType::default(),
        }
    }
}

/// Action type of an [`Action`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ActionType {
    /// Render the named template and hand off to the mail gateway
    SendEmail,
    /// Add a tag to the contact
    AddTag,
    /// Remove a tag from the contact
    RemoveTag,
    /// Add the contact to a list
    MoveToList,
    /// Remove the contact from a list
    RemoveFromList,
    /// Add a signed delta to the contact's lead score
    UpdateLeadScore,
    /// Defer the remaining actions of the branch
    Wait,
    /// Invoke an external webhook
    Webhook,
    /// Invoke a custom external callback
    CustomAction,
}

/// One action of a rule branch
///
/// `delay_minutes == 0` runs the action inline; `> 0` schedules it for
/// `now + delay` through the delayed-job scheduler instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    /// What the action does
    pub action_type: ActionType,
    /// Target or payload: template name, tag name, list id, score delta,
    /// webhook URL, or wait duration in minutes
    pub value: String,
    /// Delay before execution, in minutes
    #[serde(default)]
    pub delay_minutes: u32,
    /// Free-form parameters for webhook/custom actions
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

impl Action {
    /// Create an immediate action with no parameters
    pub fn new(action_type: ActionType, value: impl Into<String>) -> Self {
        Self {
            action_type,
            value: value.into(),
            delay_minutes: 0,
            params: HashMap::new(),
        }
    }

    /// Create a delayed action
    pub fn delayed(action_type: ActionType, value: impl Into<String>, delay_minutes: u32) -> Self {
        Self {
            action_type,
            value: value.into(),
            delay_minutes,
            params: HashMap::new(),
        }
    }
}

/// Which action list of a rule is being executed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Branch {
    /// All conditions passed
    Then,
    /// At least one condition failed
    Else,
}

/// An automation rule owned by a tenant
///
/// The trigger kind is immutable after creation; changing what a rule
/// reacts to is modeled as a new rule. Rules with `is_active == false` are
/// never evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AutomationRule {
    /// Rule id
    pub id: RuleId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Human-readable name
    pub name: String,
    /// The event kind this rule reacts to
    trigger: TriggerKind,
    /// Conditions, AND-combined
    pub conditions: Vec<Condition>,
    /// Actions of the "then" branch, in execution order
    pub actions: Vec<Action>,
    /// Actions of the "else" branch, in execution order
    pub else_actions: Vec<Action>,
    /// Whether the rule participates in evaluation
    pub is_active: bool,
    /// Visual-editor layout; opaque to the engine
    #[serde(default)]
    pub flow_layout: serde_json::Value,
}

impl AutomationRule {
    /// Create an active rule with no conditions or actions
    pub fn new(tenant_id: TenantId, name: impl Into<String>, trigger: TriggerKind) -> Self {
        Self {
            id: RuleId::new(),
            tenant_id,
            name: name.into(),
            trigger,
            conditions: Vec::new(),
            actions: Vec::new(),
            else_actions: Vec::new(),
            is_active: true,
            flow_layout: serde_json::Value::Null,
        }
    }

    /// The trigger kind; immutable after creation
    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    /// The action list of the given branch
    pub fn branch(&self, branch: Branch) -> &[Action] {
        match branch {
            Branch::Then => &self.actions,
            Branch::Else => &self.else_actions,
        }
    }

    /// Builder-style: append a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder-style: append a "then" action
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Builder-style: append an "else" action
    pub fn with_else_action(mut self, action: Action) -> Self {
        self.else_actions.push(action);
        self
    }

    /// Builder-style: deactivate the rule
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}
