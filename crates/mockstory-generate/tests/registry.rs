use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use rand::{Rng, RngCore};
use serde_json::{Map, Value};

use mockstory_core::generator::{one_of, uuid};
use mockstory_core::{GeneratorSpec, MockValue};
use mockstory_generate::{
    GenerationError, Generator, GeneratorContext, GeneratorRegistry, MockEngine, ParamKind,
    ParamSpec, ResolveOptions, validate_params,
};
use mockstory_schema::{Condition, Schema, when};

const SHOUT_PARAMS: &[ParamSpec] = &[ParamSpec::new("word", ParamKind::String, true)];

/// Upper-cases `word` and appends a random digit.
struct ShoutGenerator;

impl Generator for ShoutGenerator {
    fn id(&self) -> &'static str {
        "custom.shout"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, SHOUT_PARAMS, self.id())?;
        let word = params.get_str("word").unwrap_or_default().to_uppercase();
        let digit = rng.random_range(0..10);
        Ok(MockValue::Text(format!("{word}{digit}")))
    }
}

fn options() -> ResolveOptions {
    ResolveOptions::default()
        .with_seed(17)
        .with_today(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap_or_default())
}

#[test]
fn default_registry_lists_builtin_ids() {
    let registry = GeneratorRegistry::new();
    for id in [
        "bool",
        "number.int",
        "number.float",
        "text.chars",
        "text.pattern",
        "text.lorem",
        "choice",
        "uuid",
        "date.past",
        "date.future",
        "date.today",
        "date.between",
        "timestamp.past",
        "timestamp.future",
        "person.name",
        "internet.email",
        "company.name",
    ] {
        assert!(registry.contains(id), "missing {id}");
    }
    let ids = registry.ids();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

#[test]
fn custom_generator_is_injected() {
    let mut registry = GeneratorRegistry::new();
    registry.register_generator(Box::new(ShoutGenerator));
    let engine = MockEngine::with_registry(options(), registry);

    let schema = Schema::builder("greeting")
        .field("word", GeneratorSpec::new("custom.shout").with_param("word", "hey"))
        .build()
        .expect("greeting schema");
    engine.validate(&schema).expect("all generators known");

    let instance = engine.mock(&schema).exec().expect("resolve greeting");
    let word = instance
        .get("word")
        .and_then(MockValue::as_str)
        .expect("word");
    assert!(word.starts_with("HEY"), "{word}");
    assert_eq!(instance.report().generator_usage.get("custom.shout"), Some(&1));
}

#[test]
fn unknown_generator_fails_validation_and_resolution() {
    let schema = Schema::builder("greeting")
        .field("kind", one_of(["formal", "casual"]))
        .field(
            "word",
            when(
                Condition::eq("kind", "formal"),
                GeneratorSpec::new("custom.shout").with_param("word", "hello"),
            )
            .otherwise("hi"),
        )
        .build()
        .expect("greeting schema");
    let engine = MockEngine::new(options());

    assert!(matches!(
        engine.validate(&schema),
        Err(GenerationError::UnknownGenerator(id)) if id == "custom.shout"
    ));
    let result = engine
        .mock(&schema)
        .field("kind")
        .is("formal")
        .exec();
    assert!(matches!(result, Err(GenerationError::UnknownGenerator(_))));
}

#[test]
fn invalid_params_are_rejected() {
    let schema = Schema::builder("broken")
        .field("count", GeneratorSpec::new("number.int").with_param("min", "ten"))
        .build()
        .expect("schema builds");

    let result = MockEngine::new(options()).mock(&schema).exec();
    assert!(matches!(result, Err(GenerationError::InvalidParams(_))));
}

#[test]
fn engine_is_shared_across_threads() {
    let engine = Arc::new(MockEngine::new(options()));
    let schema = Schema::builder("token")
        .field("id", uuid())
        .field("scope", one_of(["read", "write"]))
        .id("id")
        .build()
        .expect("token schema");

    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let engine = Arc::clone(&engine);
            let schema = schema.clone();
            thread::spawn(move || {
                engine
                    .mock(&schema)
                    .seed(seed)
                    .exec()
                    .and_then(|instance| instance.fingerprint())
            })
        })
        .collect();

    let fingerprints: Vec<String> = handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .expect("thread finished")
                .expect("fingerprint")
        })
        .collect();

    for (seed, fingerprint) in fingerprints.iter().enumerate() {
        let expected = engine
            .mock(&schema)
            .seed(seed as u64)
            .exec()
            .and_then(|instance| instance.fingerprint())
            .expect("fingerprint");
        assert_eq!(fingerprint, &expected);
    }
}
