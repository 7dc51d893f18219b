use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configured generator: a registry id plus its constraint map.
///
/// Specs are values. `with_param` returns a new spec, so one spec can back
/// several fields without aliasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl GeneratorSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.params.insert(key.into(), value.into());
        next
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

pub fn boolean() -> GeneratorSpec {
    GeneratorSpec::new("bool")
}

pub fn uuid() -> GeneratorSpec {
    GeneratorSpec::new("uuid")
}

pub fn one_of<I, V>(values: I) -> GeneratorSpec
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    GeneratorSpec::new("choice").with_param("values", values)
}

pub fn pattern(pattern: &str) -> GeneratorSpec {
    GeneratorSpec::new("text.pattern").with_param("pattern", pattern)
}

pub fn lorem() -> GeneratorSpec {
    GeneratorSpec::new("text.lorem")
}

/// A date strictly before today.
pub fn past() -> GeneratorSpec {
    GeneratorSpec::new("date.past")
}

/// A date strictly after today.
pub fn future() -> GeneratorSpec {
    GeneratorSpec::new("date.future")
}

pub fn today() -> GeneratorSpec {
    GeneratorSpec::new("date.today")
}

pub fn person_name() -> GeneratorSpec {
    GeneratorSpec::new("person.name")
}

pub fn email() -> GeneratorSpec {
    GeneratorSpec::new("internet.email")
}

pub fn company() -> GeneratorSpec {
    GeneratorSpec::new("company.name")
}
