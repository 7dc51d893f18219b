use mockstory_core::MockError;
use mockstory_core::construct::int;
use mockstory_core::generator::{future, one_of, past, uuid};
use mockstory_schema::{Condition, Effect, FieldKind, OverrideSet, Schema, Trigger, when};

fn coupon() -> Schema {
    Schema::builder("coupon")
        .field("id", uuid())
        .field(
            "expiration",
            when(Condition::eq("status", "expired"), past()).otherwise(future()),
        )
        .field("status", one_of(["available", "expired", "reserved"]))
        .field("discount", int().between(5, 50).expect("discount range"))
        .keyword("expired", OverrideSet::new().set("status", "expired"))
        .id("id")
        .build()
        .expect("coupon schema")
}

#[test]
fn build_memoises_dependency_order() {
    let schema = coupon();
    assert_eq!(schema.order(), ["id", "status", "expiration", "discount"]);
    assert_eq!(schema.graph().dependents("status"), vec!["expiration"]);
    assert_eq!(schema.keywords().collect::<Vec<_>>(), ["expired"]);
}

#[test]
fn cycle_between_conditionals_fails_at_build() {
    let result = Schema::builder("loop")
        .field("plain", uuid())
        .field("a", when(Condition::eq("b", 1), 1).otherwise(2))
        .field("b", when(Condition::eq("a", 1), 1).otherwise(2))
        .build();

    match result {
        Err(MockError::Cycle { fields }) => assert_eq!(fields, ["a", "b"]),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn keyword_on_unknown_field_fails_at_build() {
    let result = Schema::builder("coupon")
        .field("status", one_of(["available"]))
        .keyword("broken", OverrideSet::new().set("state", "expired"))
        .build();

    assert!(matches!(result, Err(MockError::UnknownField { .. })));
}

#[test]
fn keyword_creating_a_cycle_fails_at_build() {
    let result = Schema::builder("pair")
        .field("a", when(Condition::eq("b", 1), 1).otherwise(2))
        .field("b", 1)
        .keyword(
            "tangled",
            OverrideSet::new().rule("b", when(Condition::eq("a", 1), 1).otherwise(2)),
        )
        .build();

    assert!(matches!(result, Err(MockError::Cycle { .. })));
}

#[test]
fn action_on_undeclared_collection_fails_at_build() {
    let result = Schema::builder("user")
        .field("id", uuid())
        .on("add", "coupon")
        .field("coupons")
        .array()
        .push()
        .build();

    assert!(matches!(result, Err(MockError::UnknownField { .. })));
}

#[test]
fn plan_layers_adhoc_overrides_over_keyword() {
    let schema = coupon();
    let adhoc = OverrideSet::new().set("status", "available");
    let plan = schema
        .plan(Some("expired"), &adhoc, true)
        .expect("plan");

    assert!(!plan.rebuilt);
    assert_eq!(plan.order(), schema.order());
    assert_eq!(plan.overridden().collect::<Vec<_>>(), ["status"]);
    let status = plan
        .steps
        .iter()
        .find(|step| step.field == "status")
        .expect("status step");
    assert!(matches!(
        &status.kind,
        FieldKind::Leaf(mockstory_schema::FieldSource::Literal(value))
            if value.as_str() == Some("available")
    ));
}

#[test]
fn dependent_override_rebuilds_order_without_touching_schema() {
    let schema = Schema::builder("span")
        .field("end", 10)
        .field("start", 1)
        .build()
        .expect("span schema");
    assert_eq!(schema.order(), ["end", "start"]);

    let adhoc = OverrideSet::new().rule(
        "end",
        FieldKind::derive(&["start"], |record| {
            let start = record.get("start").and_then(|value| value.as_i64()).unwrap_or(0);
            (start + 5).into()
        }),
    );
    let plan = schema.plan(None, &adhoc, true).expect("plan");

    assert!(plan.rebuilt);
    assert_eq!(plan.order(), ["start", "end"]);
    assert_eq!(schema.order(), ["end", "start"]);
}

#[test]
fn unknown_override_field_depends_on_strictness() {
    let schema = coupon();
    let adhoc = OverrideSet::new().set("ghost", 1).set("status", "reserved");

    let strict = schema.plan(None, &adhoc, true);
    assert!(matches!(strict, Err(MockError::UnknownField { .. })));

    let lenient = schema.plan(None, &adhoc, false).expect("lenient plan");
    assert_eq!(lenient.skipped, ["ghost"]);
    assert_eq!(lenient.overridden().collect::<Vec<_>>(), ["status"]);
}

#[test]
fn unknown_keyword_is_reported() {
    let result = coupon().plan(Some("birthday"), &OverrideSet::new(), true);
    assert!(matches!(result, Err(MockError::UnknownKeyword { .. })));
}

#[test]
fn auto_registers_one_action_per_builtin_trigger() {
    let schema = Schema::builder("user")
        .field("coupons", FieldKind::literal(Vec::<mockstory_core::MockValue>::new()))
        .on(Trigger::Add, "coupon")
        .id("code")
        .field("coupons")
        .array()
        .auto()
        .build()
        .expect("user schema");

    let labels: Vec<(String, &str)> = schema
        .actions()
        .iter()
        .map(|action| (action.trigger.to_string(), action.effect.label()))
        .collect();
    assert_eq!(
        labels,
        [
            ("add".to_string(), "upsert"),
            ("remove".to_string(), "delete"),
            ("change".to_string(), "update"),
        ]
    );
    let change = schema.actions_for(&Trigger::Change, "coupon");
    assert_eq!(change.len(), 1);
    assert!(matches!(change[0].effect, Effect::Update { .. }));
    assert_eq!(
        change[0].id.as_ref().and_then(|id| id.field_name()),
        Some("code")
    );
}

#[test]
fn clones_share_one_definition() {
    let schema = coupon();
    let other = schema.clone();
    assert!(schema.same_as(&other));
    assert!(!schema.same_as(&coupon()));
}
