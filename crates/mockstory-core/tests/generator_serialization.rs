use mockstory_core::construct::int;
use mockstory_core::{GeneratorSpec, RangeConstruct, Rule};

#[test]
fn serializes_generator_spec_deterministically() {
    let spec: GeneratorSpec = RangeConstruct::with_rule(Rule::range(10, 50))
        .and_then(|construct| construct.between(20, 40))
        .expect("bounds inside rule")
        .even()
        .into();

    let json = serde_json::to_string_pretty(&spec).expect("serialize spec");
    let expected = r#"{
  "id": "number.int",
  "params": {
    "max": 40,
    "min": 20,
    "parity": "even"
  }
}"#;
    assert_eq!(json, expected);
}

#[test]
fn deserializes_spec_without_params() {
    let spec: GeneratorSpec =
        serde_json::from_str(r#"{"id": "uuid"}"#).expect("deserialize spec");
    assert_eq!(spec, GeneratorSpec::new("uuid"));
    assert_eq!(
        serde_json::to_string(&spec).expect("serialize spec"),
        r#"{"id":"uuid"}"#
    );
}

#[test]
fn unbounded_construct_has_no_params() {
    let spec = int().into_generator();
    assert!(spec.params.is_empty());
}
