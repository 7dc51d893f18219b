use std::env;
use std::path::PathBuf;

use mockstory_core::MockValue;
use mockstory_core::construct::int;
use mockstory_core::generator::{email, future, one_of, past, person_name, today, uuid};
use mockstory_generate::{MockEngine, ResolveOptions};
use mockstory_schema::{Condition, OverrideSet, Schema, Trigger, when};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--seed" => seed = args.next().map(|value| value.parse()).transpose()?,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let mut options = match config_path {
        Some(path) => ResolveOptions::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => ResolveOptions::default(),
    };
    if let Some(seed) = seed {
        options.seed = Some(seed);
    }

    let coupon = Schema::builder("coupon")
        .field("code", uuid())
        .field(
            "expiration",
            when(Condition::eq("status", "expired"), past()).otherwise(future()),
        )
        .field("status", one_of(["available", "expired", "reserved"]))
        .field("discount", int().between(5, 50)?)
        .keyword("expired", OverrideSet::new().set("status", "expired"))
        .id("code")
        .build()?;

    let user = Schema::builder("user")
        .field("id", uuid())
        .field("name", person_name())
        .field("email", email())
        .field("birthdate", past())
        .field("coupons", MockValue::List(Vec::new()))
        .keyword("birthday", OverrideSet::new().generate("birthdate", today()))
        .id("id")
        .name("name")
        .on(Trigger::Add, "coupon")
        .field("coupons")
        .array()
        .auto()
        .build()?;

    let engine = MockEngine::new(options);
    let mut story = engine
        .story()
        .add("user", engine.mock(&user).keyword("birthday"))
        .add("welcome", engine.mock(&coupon).field("status").is("available"))
        .add("stale", engine.mock(&coupon).keyword("expired"))
        .exec()?;

    story.add_to("user", "welcome")?;
    story.add_to("user", "stale")?;
    story.update("welcome", "discount", 50)?;
    story.remove("stale")?;

    println!("{}", serde_json::to_string_pretty(&story.to_json())?);
    Ok(())
}
