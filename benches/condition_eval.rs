// Copyright 2025 Cowboy AI, LLC.

//! Condition evaluation benchmarks
//!
//! The evaluator sits on the hot path of every dispatched event, so its
//! cost per condition is worth watching.

use automation_engine::{
    evaluate, evaluate_all, keys, Condition, ConditionOperator, Contact, ContactId,
    EvaluationContext, ListId, TenantId,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_contact() -> Contact {
    let mut contact = Contact::new(
        ContactId::new(),
        TenantId::new(),
        "ada@example.com",
        "Ada",
        "Lovelace",
    );
    contact.lead_score = 75;
    for tag in ["Newsletter", "Customer", "Beta", "Webinar", "Q3"] {
        contact.add_tag(tag);
    }
    contact.join_list(ListId::new(), "Customers");
    contact
}

fn bench_context() -> EvaluationContext {
    EvaluationContext::new()
        .with(keys::CONTACT_EMAIL, "ada@example.com")
        .with(keys::TAG_ADDED, "Newsletter")
        .with(keys::EMAIL_OPENED, true)
}

fn single_conditions(c: &mut Criterion) {
    let contact = bench_contact();
    let ctx = bench_context();

    let mut group = c.benchmark_group("evaluate");
    group.bench_function("numeric_greater_than", |b| {
        let condition = Condition::new("leadScore", ConditionOperator::GreaterThan, "70");
        b.iter(|| evaluate(black_box(&condition), black_box(&contact), black_box(&ctx)))
    });
    group.bench_function("string_equals", |b| {
        let condition = Condition::new("email", ConditionOperator::Equals, "ada@example.com");
        b.iter(|| evaluate(black_box(&condition), black_box(&contact), black_box(&ctx)))
    });
    group.bench_function("has_tag", |b| {
        let condition = Condition::new("", ConditionOperator::HasTag, "Newsletter");
        b.iter(|| evaluate(black_box(&condition), black_box(&contact), black_box(&ctx)))
    });
    group.bench_function("in_list", |b| {
        let condition = Condition::new("", ConditionOperator::InList, "Customers");
        b.iter(|| evaluate(black_box(&condition), black_box(&contact), black_box(&ctx)))
    });
    group.bench_function("context_lookup", |b| {
        let condition = Condition::new(keys::TAG_ADDED, ConditionOperator::Equals, "Newsletter");
        b.iter(|| evaluate(black_box(&condition), black_box(&contact), black_box(&ctx)))
    });
    group.finish();
}

fn condition_lists(c: &mut Criterion) {
    let contact = bench_contact();
    let ctx = bench_context();

    let conditions: Vec<Condition> = vec![
        Condition::new("leadScore", ConditionOperator::GreaterThan, "70"),
        Condition::new("", ConditionOperator::HasTag, "Newsletter"),
        Condition::new("email", ConditionOperator::Contains, "@example."),
        Condition::new("", ConditionOperator::InList, "Customers"),
        Condition::new("", ConditionOperator::EmailOpened, ""),
    ];

    let mut group = c.benchmark_group("evaluate_all");
    group.bench_function("five_passing_conditions", |b| {
        b.iter(|| evaluate_all(black_box(&conditions), black_box(&contact), black_box(&ctx)))
    });

    // First condition fails, so the AND short-circuits immediately.
    let mut failing_first = conditions.clone();
    failing_first[0] = Condition::new("leadScore", ConditionOperator::GreaterThan, "90");
    group.bench_function("short_circuit_on_first", |b| {
        b.iter(|| {
            evaluate_all(
                black_box(&failing_first),
                black_box(&contact),
                black_box(&ctx),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, single_conditions, condition_lists);
criterion_main!(benches);
