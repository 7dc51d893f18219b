use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rand::RngCore;
use serde_json::{Map, Value};

use mockstory_core::{GeneratorSpec, MockValue, Record};

use crate::errors::GenerationError;

pub mod primitives;
pub mod semantic;
pub mod temporal;

/// Everything a generator may read besides its params.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub schema: &'a str,
    pub field: &'a str,
    pub today: NaiveDate,
    pub now: NaiveDateTime,
    pub past_days: u32,
    pub future_days: u32,
    /// Sibling values resolved so far.
    pub resolved: &'a Record,
}

/// A value-producing function configured by JSON params.
///
/// Implementations are stateless; all randomness comes from `rng`.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError>;
}

/// Generators addressable by id.
pub struct GeneratorRegistry {
    generators: HashMap<&'static str, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Registry with the default generators.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        primitives::register(&mut registry);
        temporal::register(&mut registry);
        semantic::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Add a generator; an existing one with the same id is replaced.
    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn generator(&self, id: &str) -> Option<&dyn Generator> {
        self.generators.get(id).map(|generator| generator.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.generators.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn generate(
        &self,
        spec: &GeneratorSpec,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let generator = self
            .generator(spec.id())
            .ok_or_else(|| GenerationError::UnknownGenerator(spec.id().to_string()))?;
        generator.generate(ctx, &spec.params, rng)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
