use serde::de::DeserializeOwned;

use mockstory_core::{GeneratorSpec, MockValue};
use mockstory_schema::{FieldKind, FieldSource, OverrideSet, Schema};

use crate::engine::MockEngine;
use crate::errors::GenerationError;
use crate::instance::Instance;

/// Everything needed to resolve one instance, detached from any engine.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub schema: Schema,
    pub keyword: Option<String>,
    pub overrides: OverrideSet,
    /// Overrides the engine seed for this request.
    pub seed: Option<u64>,
}

impl MockRequest {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            keyword: None,
            overrides: OverrideSet::new(),
            seed: None,
        }
    }
}

impl From<Schema> for MockRequest {
    fn from(schema: Schema) -> Self {
        Self::new(schema)
    }
}

impl From<&Schema> for MockRequest {
    fn from(schema: &Schema) -> Self {
        Self::new(schema.clone())
    }
}

/// Request handle returned by [`MockEngine::mock`].
///
/// Each call returns a new handle; the schema itself is never touched.
#[derive(Debug, Clone)]
pub struct Mock<'e> {
    engine: &'e MockEngine,
    request: MockRequest,
}

impl<'e> Mock<'e> {
    pub(crate) fn new(engine: &'e MockEngine, request: MockRequest) -> Self {
        Self { engine, request }
    }

    /// Apply a keyword preset declared on the schema.
    pub fn keyword(mut self, name: &str) -> Self {
        self.request.keyword = Some(name.to_string());
        self
    }

    /// Scoped builder for a single-field override.
    pub fn field(self, name: &str) -> FieldOverride<'e> {
        FieldOverride {
            mock: self,
            field: name.to_string(),
        }
    }

    /// Append a whole set of ad-hoc overrides.
    pub fn overrides(mut self, overrides: &OverrideSet) -> Self {
        self.request.overrides = self.request.overrides.layered(overrides);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.request.seed = Some(seed);
        self
    }

    pub fn request(&self) -> &MockRequest {
        &self.request
    }

    pub fn into_request(self) -> MockRequest {
        self.request
    }

    pub fn exec(self) -> Result<Instance, GenerationError> {
        self.engine.run(self)
    }

    /// Resolve and deserialize into `T`.
    pub fn exec_as<T: DeserializeOwned>(self) -> Result<T, GenerationError> {
        self.exec()?.deserialize()
    }
}

/// Override for one field of a [`Mock`] request.
#[derive(Debug, Clone)]
pub struct FieldOverride<'e> {
    mock: Mock<'e>,
    field: String,
}

impl<'e> FieldOverride<'e> {
    /// Pin the field to a value.
    pub fn is(self, value: impl Into<MockValue>) -> Mock<'e> {
        self.rule(FieldKind::literal(value))
    }

    /// Draw the field from another generator.
    pub fn generate(self, spec: impl Into<GeneratorSpec>) -> Mock<'e> {
        self.rule(FieldKind::generator(spec))
    }

    /// Replace the field's rule, conditionals and derived values included.
    pub fn rule(self, kind: impl Into<FieldKind>) -> Mock<'e> {
        let Self { mut mock, field } = self;
        mock.request.overrides.push(&field, kind.into());
        mock
    }

    /// Restrict a date field to `year`.
    ///
    /// A declared `date.between` generator keeps its bounds and gains the
    /// year; any other rule is replaced by a fresh `date.between`.
    pub fn year(self, year: i32) -> Mock<'e> {
        let spec = match self.mock.request.schema.field(&self.field).map(|node| &node.kind) {
            Some(FieldKind::Leaf(FieldSource::Generator(spec))) if spec.id() == "date.between" => {
                spec.with_param("year", year)
            }
            _ => GeneratorSpec::new("date.between").with_param("year", year),
        };
        self.generate(spec)
    }
}
