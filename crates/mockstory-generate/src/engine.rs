use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use mockstory_core::{GeneratorSpec, MockValue};
use mockstory_schema::{FieldKind, FieldSource, OverrideSet, Schema};

use crate::effects::value_key;
use crate::errors::GenerationError;
use crate::generators::GeneratorRegistry;
use crate::generators::primitives::random_uuid;
use crate::instance::Instance;
use crate::mock::{Mock, MockRequest};
use crate::model::{ResolutionReport, ResolveOptions};
use crate::resolver::Resolver;
use crate::story::StoryBuilder;

/// Entry point for resolving schemas into instances.
///
/// The engine is immutable and cheap to clone; one engine can serve many
/// threads, each resolution owning its rng and record.
#[derive(Debug, Clone)]
pub struct MockEngine {
    registry: Arc<GeneratorRegistry>,
    options: ResolveOptions,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new(ResolveOptions::default())
    }
}

impl MockEngine {
    pub fn new(options: ResolveOptions) -> Self {
        Self::with_registry(options, GeneratorRegistry::new())
    }

    /// Engine over a caller-supplied registry.
    pub fn with_registry(options: ResolveOptions, registry: GeneratorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            options,
        }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Request handle for `schema`; see [`Mock::exec`].
    pub fn mock(&self, schema: &Schema) -> Mock<'_> {
        Mock::new(self, MockRequest::new(schema.clone()))
    }

    /// Resolve a request. Equivalent to `mock.exec()`.
    pub fn run(&self, mock: Mock<'_>) -> Result<Instance, GenerationError> {
        let request = mock.into_request();
        let seed = self.seed_for(request.seed);
        self.resolve_request(&request, seed)
    }

    pub fn story(&self) -> StoryBuilder<'_> {
        StoryBuilder::new(self)
    }

    /// "Today" for this engine: the configured date or the local one.
    pub fn today(&self) -> NaiveDate {
        self.options
            .today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Resolve with a caller-owned rng.
    pub fn resolve(
        &self,
        schema: &Schema,
        keyword: Option<&str>,
        overrides: &OverrideSet,
        rng: &mut dyn RngCore,
    ) -> Result<Instance, GenerationError> {
        self.resolve_with(schema, keyword, overrides, None, rng)
    }

    /// Check that every generator the schema names is registered.
    pub fn validate(&self, schema: &Schema) -> Result<(), GenerationError> {
        let mut specs = Vec::new();
        for node in schema.fields() {
            collect_specs(&node.kind, &mut specs);
        }
        for keyword in schema.keywords() {
            if let Some(overrides) = schema.keyword(keyword) {
                for (_, kind) in overrides.entries() {
                    collect_specs(kind, &mut specs);
                }
            }
        }
        match specs.iter().find(|spec| !self.registry.contains(spec.id())) {
            Some(spec) => Err(GenerationError::UnknownGenerator(spec.id().to_string())),
            None => Ok(()),
        }
    }

    pub(crate) fn seed_for(&self, requested: Option<u64>) -> u64 {
        match requested.or(self.options.seed) {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!(seed, "no seed configured, using fresh entropy");
                seed
            }
        }
    }

    pub(crate) fn resolve_request(
        &self,
        request: &MockRequest,
        seed: u64,
    ) -> Result<Instance, GenerationError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.resolve_with(
            &request.schema,
            request.keyword.as_deref(),
            &request.overrides,
            Some(seed),
            &mut rng,
        )
    }

    fn resolve_with(
        &self,
        schema: &Schema,
        keyword: Option<&str>,
        overrides: &OverrideSet,
        seed: Option<u64>,
        rng: &mut dyn RngCore,
    ) -> Result<Instance, GenerationError> {
        let start = Instant::now();
        let today = self.today();
        debug!(
            schema = %schema.name(),
            keyword = keyword.unwrap_or_default(),
            seed = seed.unwrap_or_default(),
            overrides = overrides.entries().len(),
            "resolution started"
        );

        let result = (|| -> Result<Instance, GenerationError> {
            let plan = schema.plan(keyword, overrides, self.options.strict)?;
            let mut report = ResolutionReport::new(schema.name(), seed, today);
            report.keyword = keyword.map(str::to_string);

            let resolver = Resolver::new(
                &self.registry,
                today,
                self.now(today),
                self.options.past_days,
                self.options.future_days,
            );
            let values = resolver.resolve(schema.name(), &plan, rng, &mut report)?;
            let fallback_id = MockValue::Uuid(random_uuid(rng));
            Ok(Instance::new(schema.clone(), values, report, fallback_id))
        })();

        match result {
            Ok(instance) => {
                info!(
                    schema = %schema.name(),
                    id = %value_key(instance.id()),
                    fields = instance.values().len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "instance resolved"
                );
                Ok(instance)
            }
            Err(err) => {
                warn!(schema = %schema.name(), error = %err, "resolution failed");
                Err(err)
            }
        }
    }

    /// Fixed "today" pins "now" to its midnight so timestamps stay reproducible.
    fn now(&self, today: NaiveDate) -> NaiveDateTime {
        match self.options.today {
            Some(_) => today.and_time(NaiveTime::MIN),
            None => Local::now().naive_local(),
        }
    }
}

fn collect_specs<'a>(kind: &'a FieldKind, specs: &mut Vec<&'a GeneratorSpec>) {
    match kind {
        FieldKind::Leaf(FieldSource::Generator(spec)) => specs.push(spec),
        FieldKind::Leaf(_) => {}
        FieldKind::Conditional { branches, default } => {
            for branch in branches {
                collect_specs(&branch.then, specs);
            }
            if let Some(default) = default {
                collect_specs(default, specs);
            }
        }
    }
}

/// Derive a per-slot seed from a story seed.
pub(crate) fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
