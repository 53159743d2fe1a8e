// Copyright 2025 Cowboy AI, LLC.

//! Condition evaluation
//!
//! A pure function from (condition, contact, context) to a boolean. The
//! evaluator fails closed: a missing field or malformed value makes the
//! condition `false`, logged at warn level, never an error. Comparison
//! operators attempt numeric comparison first and fall back to string
//! comparison when either side is not numeric.

use crate::contact::Contact;
use crate::context::{keys, EvaluationContext};
use crate::rule::{Condition, ConditionOperator};
use tracing::warn;

/// Evaluate a single condition against a contact and its event context
pub fn evaluate(condition: &Condition, contact: &Contact, ctx: &EvaluationContext) -> bool {
    match condition.operator {
        ConditionOperator::HasTag => contact.has_tag(&condition.value),
        ConditionOperator::NotHasTag => !contact.has_tag(&condition.value),
        ConditionOperator::InList => contact.in_list(&condition.value),
        ConditionOperator::NotInList => !contact.in_list(&condition.value),
        // These exist so a rule can guard on "the current event is an
        // open/click" independent of its trigger kind; the flags are set by
        // the corresponding trigger handlers.
        ConditionOperator::EmailOpened => ctx.flag(keys::EMAIL_OPENED),
        ConditionOperator::EmailClicked => ctx.flag(keys::EMAIL_CLICKED),
        ConditionOperator::Equals
        | ConditionOperator::NotEquals
        | ConditionOperator::Contains
        | ConditionOperator::NotContains
        | ConditionOperator::GreaterThan
        | ConditionOperator::LessThan => {
            let Some(actual) = resolve_field(contact, ctx, &condition.field) else {
                warn!(
                    field = %condition.field,
                    operator = ?condition.operator,
                    "condition field not found, evaluating to false"
                );
                return false;
            };
            compare(condition.operator, &actual, &condition.value)
        }
    }
}

/// Evaluate all conditions of a rule with AND semantics
///
/// An empty condition list evaluates to `true` (a trigger-only rule).
pub fn evaluate_all(conditions: &[Condition], contact: &Contact, ctx: &EvaluationContext) -> bool {
    conditions.iter().all(|c| evaluate(c, contact, ctx))
}

/// Resolve a field name against the contact first, then the context
///
/// Contact fields accept both the wire-format camelCase names used by the
/// rule editor and snake_case.
fn resolve_field(contact: &Contact, ctx: &EvaluationContext, field: &str) -> Option<String> {
    match field {
        "email" | "contactEmail" => Some(contact.email.clone()),
        "firstName" | "first_name" => Some(contact.first_name.clone()),
        "lastName" | "last_name" => Some(contact.last_name.clone()),
        "leadScore" | "lead_score" => Some(contact.lead_score.to_string()),
        "lastActivityAt" | "last_activity_at" => {
            contact.last_activity_at.map(|t| t.to_rfc3339())
        }
        _ => ctx.get_string(field),
    }
}

fn compare(operator: ConditionOperator, actual: &str, expected: &str) -> bool {
    // Numeric comparison first; fall back to string semantics when either
    // side does not parse.
    let numeric = actual
        .trim()
        .parse::<f64>()
        .ok()
        .zip(expected.trim().parse::<f64>().ok());

    match operator {
        ConditionOperator::Equals => match numeric {
            Some((a, e)) => a == e,
            None => actual == expected,
        },
        ConditionOperator::NotEquals => match numeric {
            Some((a, e)) => a != e,
            None => actual != expected,
        },
        ConditionOperator::GreaterThan => match numeric {
            Some((a, e)) => a > e,
            None => actual > expected,
        },
        ConditionOperator::LessThan => match numeric {
            Some((a, e)) => a < e,
            None => actual < expected,
        },
        ConditionOperator::Contains => actual.contains(expected),
        ConditionOperator::NotContains => !actual.contains(expected),
        _ => {
            // Membership and flag operators never reach here.
            warn!(?operator, "comparison called with non-comparison operator");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{ContactId, ListId, TenantId};
    use proptest::prelude::*;
    use test_case::test_case;

    fn contact() -> Contact {
        let mut c = Contact::new(
            ContactId::new(),
            TenantId::new(),
            "ada@example.com",
            "Ada",
            "Lovelace",
        );
        c.lead_score = 75;
        c.add_tag("Newsletter");
        c.join_list(ListId::new(), "Customers");
        c
    }

    #[test_case(ConditionOperator::Equals, "leadScore", "75", true; "numeric equals")]
    #[test_case(ConditionOperator::Equals, "leadScore", "75.0", true; "numeric equals float form")]
    #[test_case(ConditionOperator::NotEquals, "leadScore", "70", true; "numeric not equals")]
    #[test_case(ConditionOperator::GreaterThan, "leadScore", "70", true; "greater than passes")]
    #[test_case(ConditionOperator::GreaterThan, "leadScore", "80", false; "greater than fails")]
    #[test_case(ConditionOperator::LessThan, "leadScore", "80", true; "less than passes")]
    #[test_case(ConditionOperator::Equals, "email", "ada@example.com", true; "string equals")]
    #[test_case(ConditionOperator::Contains, "email", "@example.", true; "contains substring")]
    #[test_case(ConditionOperator::NotContains, "email", "@other.", true; "not contains")]
    #[test_case(ConditionOperator::Equals, "firstName", "Grace", false; "string equals fails")]
    fn comparison_operators(
        operator: ConditionOperator,
        field: &str,
        value: &str,
        expected: bool,
    ) {
        let condition = Condition::new(field, operator, value);
        let ctx = EvaluationContext::new();
        assert_eq!(evaluate(&condition, &contact(), &ctx), expected);
    }

    #[test_case("Newsletter", true; "present tag")]
    #[test_case("VIP", false; "absent tag")]
    fn has_tag_membership(tag: &str, expected: bool) {
        let condition = Condition::new("", ConditionOperator::HasTag, tag);
        let ctx = EvaluationContext::new();
        assert_eq!(evaluate(&condition, &contact(), &ctx), expected);
    }

    #[test_case("Newsletter", false; "present tag")]
    #[test_case("VIP", true; "absent tag")]
    fn not_has_tag_membership(tag: &str, expected: bool) {
        let condition = Condition::new("", ConditionOperator::NotHasTag, tag);
        let ctx = EvaluationContext::new();
        assert_eq!(evaluate(&condition, &contact(), &ctx), expected);
    }

    #[test]
    fn has_tag_is_monotonic_in_the_mutation() {
        let mut c = contact();
        let condition = Condition::new("", ConditionOperator::HasTag, "VIP");
        let ctx = EvaluationContext::new();
        assert!(!evaluate(&condition, &c, &ctx));
        c.add_tag("VIP");
        assert!(evaluate(&condition, &c, &ctx));
    }

    #[test]
    fn list_membership_operators() {
        let c = contact();
        let ctx = EvaluationContext::new();
        assert!(evaluate(
            &Condition::new("", ConditionOperator::InList, "Customers"),
            &c,
            &ctx
        ));
        assert!(evaluate(
            &Condition::new("", ConditionOperator::NotInList, "Churned"),
            &c,
            &ctx
        ));
    }

    #[test]
    fn event_flag_operators_read_context() {
        let c = contact();
        let opened_ctx = EvaluationContext::new().with(keys::EMAIL_OPENED, true);
        let empty_ctx = EvaluationContext::new();

        let opened = Condition::new("", ConditionOperator::EmailOpened, "");
        assert!(evaluate(&opened, &c, &opened_ctx));
        assert!(!evaluate(&opened, &c, &empty_ctx));

        let clicked = Condition::new("", ConditionOperator::EmailClicked, "");
        assert!(!evaluate(&clicked, &c, &opened_ctx));
    }

    #[test]
    fn context_fields_resolve_after_contact_fields() {
        let c = contact();
        let ctx = EvaluationContext::new().with(keys::TAG_ADDED, "Newsletter");
        let condition = Condition::new(keys::TAG_ADDED, ConditionOperator::Equals, "Newsletter");
        assert!(evaluate(&condition, &c, &ctx));
    }

    #[test]
    fn missing_field_fails_closed() {
        let c = contact();
        let ctx = EvaluationContext::new();
        let condition = Condition::new("noSuchField", ConditionOperator::Equals, "anything");
        assert!(!evaluate(&condition, &c, &ctx));
        // NotEquals on a missing field is also false: fail-closed, not
        // vacuously true.
        let condition = Condition::new("noSuchField", ConditionOperator::NotEquals, "anything");
        assert!(!evaluate(&condition, &c, &ctx));
    }

    #[test]
    fn empty_condition_list_is_true() {
        let c = contact();
        let ctx = EvaluationContext::new();
        assert!(evaluate_all(&[], &c, &ctx));
    }

    #[test]
    fn and_semantics_across_conditions() {
        let c = contact();
        let ctx = EvaluationContext::new();
        let passing = Condition::new("leadScore", ConditionOperator::GreaterThan, "70");
        let failing = Condition::new("leadScore", ConditionOperator::GreaterThan, "80");
        assert!(evaluate_all(&[passing.clone()], &c, &ctx));
        assert!(!evaluate_all(&[passing, failing], &c, &ctx));
    }

    proptest! {
        #[test]
        fn numeric_ordering_agrees_with_f64(a in -1e9f64..1e9f64, b in -1e9f64..1e9f64) {
            let mut c = contact();
            c.lead_score = 0;
            let ctx = EvaluationContext::new().with("x", a);
            let gt = Condition::new("x", ConditionOperator::GreaterThan, b.to_string());
            let lt = Condition::new("x", ConditionOperator::LessThan, b.to_string());
            prop_assert_eq!(evaluate(&gt, &c, &ctx), a > b);
            prop_assert_eq!(evaluate(&lt, &c, &ctx), a < b);
        }
    }
}
