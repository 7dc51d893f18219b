use chrono::{Datelike, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use mockstory_core::construct::{date, int};
use mockstory_core::generator::{future, one_of, past, person_name, uuid};
use mockstory_core::{MockError, MockValue};
use mockstory_generate::{GenerationError, MockEngine, ResolveOptions};
use mockstory_schema::{Condition, FieldKind, OverrideSet, Schema, when};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap_or_default()
}

fn engine(seed: u64) -> MockEngine {
    MockEngine::new(ResolveOptions::default().with_seed(seed).with_today(today()))
}

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
fn every_declared_field_is_resolved() {
    let schema = coupon();
    let instance = engine(1).mock(&schema).exec().expect("resolve coupon");

    for field in ["id", "expiration", "status", "discount"] {
        assert!(instance.get(field).is_some(), "missing {field}");
    }
    let discount = instance
        .get("discount")
        .and_then(MockValue::as_i64)
        .expect("discount");
    assert!((5..=50).contains(&discount));
    assert_eq!(instance.id(), instance.get("id").expect("id"));
    assert_eq!(instance.report().fields, 4);
    assert_eq!(instance.report().generator_usage.get("uuid"), Some(&1));
}

#[test]
fn expiration_follows_status() {
    let schema = coupon();
    for seed in 0..40 {
        let instance = engine(seed).mock(&schema).exec().expect("resolve coupon");
        let status = instance
            .get("status")
            .and_then(MockValue::as_str)
            .expect("status");
        let expiration = instance
            .get("expiration")
            .and_then(MockValue::as_date)
            .expect("expiration");

        if status == "expired" {
            assert!(expiration < today(), "seed {seed}: {expiration}");
            assert_eq!(
                instance.report().branches.get("expiration").map(String::as_str),
                Some("branch 0")
            );
        } else {
            assert!(expiration > today(), "seed {seed}: {expiration}");
        }
    }
}

#[test]
fn adhoc_override_beats_keyword() {
    let schema = coupon();
    let instance = engine(3)
        .mock(&schema)
        .keyword("expired")
        .field("status")
        .is("available")
        .exec()
        .expect("resolve coupon");

    assert_eq!(
        instance.get("status"),
        Some(&MockValue::Text("available".into()))
    );
    let expiration = instance
        .get("expiration")
        .and_then(MockValue::as_date)
        .expect("expiration");
    assert!(expiration > today());
    assert_eq!(instance.report().keyword.as_deref(), Some("expired"));
    assert_eq!(instance.report().overridden, ["status"]);
}

#[test]
fn keyword_alone_sets_expired_in_the_past() {
    let schema = coupon();
    let instance = engine(5)
        .mock(&schema)
        .keyword("expired")
        .exec()
        .expect("resolve coupon");

    assert_eq!(instance.get("status"), Some(&MockValue::Text("expired".into())));
    let expiration = instance
        .get("expiration")
        .and_then(MockValue::as_date)
        .expect("expiration");
    assert!(expiration < today());
}

#[test]
fn same_seed_gives_same_fingerprint() {
    let schema = coupon();
    let first = engine(42).mock(&schema).exec().expect("first");
    let second = engine(42).mock(&schema).exec().expect("second");
    let other = engine(43).mock(&schema).exec().expect("other");

    let fingerprint = first.fingerprint().expect("fingerprint");
    assert_eq!(fingerprint.len(), 64);
    assert_eq!(fingerprint, second.fingerprint().expect("fingerprint"));
    assert_ne!(fingerprint, other.fingerprint().expect("fingerprint"));
}

#[test]
fn request_seed_overrides_engine_seed() {
    let schema = coupon();
    let pinned = engine(1).mock(&schema).seed(9).exec().expect("pinned");
    let direct = engine(9).mock(&schema).exec().expect("direct");

    assert_eq!(pinned.to_json(), direct.to_json());
}

#[test]
fn run_and_exec_are_equivalent() {
    let schema = coupon();
    let engine = engine(11);
    let via_exec = engine.mock(&schema).keyword("expired").exec().expect("exec");
    let via_run = engine
        .run(engine.mock(&schema).keyword("expired"))
        .expect("run");

    assert_eq!(via_exec.to_json(), via_run.to_json());
}

#[test]
fn derived_override_rebuilds_the_plan() {
    let schema = coupon();
    let instance = engine(8)
        .mock(&schema)
        .field("discount")
        .rule(FieldKind::derive(&["status"], |record| {
            match record.get("status").and_then(MockValue::as_str) {
                Some("expired") => MockValue::Int(0),
                _ => MockValue::Int(10),
            }
        }))
        .field("status")
        .is("expired")
        .exec()
        .expect("resolve coupon");

    assert_eq!(instance.get("discount"), Some(&MockValue::Int(0)));
    assert!(instance.report().plan_rebuilt);
}

#[test]
fn literal_override_keeps_the_base_plan() {
    let schema = coupon();
    let instance = engine(8)
        .mock(&schema)
        .field("discount")
        .is(25)
        .exec()
        .expect("resolve coupon");

    assert_eq!(instance.get("discount"), Some(&MockValue::Int(25)));
    assert!(!instance.report().plan_rebuilt);
}

#[test]
fn year_override_narrows_a_date_field() {
    let schema = Schema::builder("person")
        .field("name", person_name())
        .field(
            "birthdate",
            date()
                .between(
                    NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or_default(),
                    NaiveDate::from_ymd_opt(2010, 12, 31).unwrap_or_default(),
                )
                .expect("birthdate range"),
        )
        .build()
        .expect("person schema");

    for seed in 0..10 {
        let instance = engine(seed)
            .mock(&schema)
            .field("birthdate")
            .year(1987)
            .exec()
            .expect("resolve person");
        let birthdate = instance
            .get("birthdate")
            .and_then(MockValue::as_date)
            .expect("birthdate");
        assert_eq!(birthdate.year(), 1987);
    }
}

#[test]
fn strict_mode_rejects_unknown_override() {
    let schema = coupon();
    let result = engine(1).mock(&schema).field("colour").is("red").exec();

    assert!(matches!(
        result,
        Err(GenerationError::Mock(MockError::UnknownField { .. }))
    ));
}

#[test]
fn lenient_mode_skips_unknown_override() {
    let schema = coupon();
    let options = ResolveOptions {
        strict: false,
        ..ResolveOptions::default().with_seed(1).with_today(today())
    };
    let instance = MockEngine::new(options)
        .mock(&schema)
        .field("colour")
        .is("red")
        .exec()
        .expect("resolve coupon");

    assert!(instance.get("colour").is_none());
    assert_eq!(instance.report().skipped_overrides, ["colour"]);
}

#[test]
fn unknown_keyword_fails() {
    let schema = coupon();
    let result = engine(1).mock(&schema).keyword("vintage").exec();

    assert!(matches!(
        result,
        Err(GenerationError::Mock(MockError::UnknownKeyword { .. }))
    ));
}

#[test]
fn conditional_without_default_reports_no_branch() {
    let schema = Schema::builder("ticket")
        .field("status", "open")
        .field(
            "closed_at",
            FieldKind::from(when(Condition::eq("status", "closed"), past())),
        )
        .build()
        .expect("ticket schema");

    let result = engine(1).mock(&schema).exec();
    assert!(matches!(
        result,
        Err(GenerationError::Mock(MockError::NoBranchMatched { .. }))
    ));
}

#[test]
fn caller_owned_rng_is_deterministic() {
    let schema = coupon();
    let engine = engine(0);
    let overrides = OverrideSet::new().set("discount", 7);

    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let first = engine
        .resolve(&schema, None, &overrides, &mut rng)
        .expect("first");
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let second = engine
        .resolve(&schema, None, &overrides, &mut rng)
        .expect("second");

    assert_eq!(first.to_json(), second.to_json());
    assert_eq!(first.get("discount"), Some(&MockValue::Int(7)));
    assert_eq!(first.report().seed, None);
}

#[derive(Debug, Deserialize)]
struct Coupon {
    id: String,
    status: String,
    expiration: NaiveDate,
    discount: i64,
}

#[test]
fn exec_as_deserializes_into_a_struct() {
    let schema = coupon();
    let coupon: Coupon = engine(4)
        .mock(&schema)
        .keyword("expired")
        .exec_as()
        .expect("typed coupon");

    assert_eq!(coupon.id.len(), 36);
    assert_eq!(coupon.status, "expired");
    assert!(coupon.expiration < today());
    assert!((5..=50).contains(&coupon.discount));
}
