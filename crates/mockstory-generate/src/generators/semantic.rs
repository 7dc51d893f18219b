use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName, Name};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};

use mockstory_core::MockValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::validate_params;

#[derive(Clone, Copy)]
enum Kind {
    Name,
    FirstName,
    LastName,
    Email,
    Company,
}

pub fn register(registry: &mut GeneratorRegistry) {
    for (id, kind) in [
        ("person.name", Kind::Name),
        ("person.first_name", Kind::FirstName),
        ("person.last_name", Kind::LastName),
        ("internet.email", Kind::Email),
        ("company.name", Kind::Company),
    ] {
        registry.register_generator(Box::new(FakeGenerator { id, kind }));
    }
}

/// English-locale values from the `fake` crate.
struct FakeGenerator {
    id: &'static str,
    kind: Kind,
}

impl Generator for FakeGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        validate_params(params, &[], self.id)?;

        // fake wants a sized rng; derive one from the caller's stream.
        let mut seed = [0_u8; 32];
        rng.fill_bytes(&mut seed);
        let mut fake_rng = ChaCha8Rng::from_seed(seed);

        let value: String = match self.kind {
            Kind::Name => Name().fake_with_rng(&mut fake_rng),
            Kind::FirstName => FirstName().fake_with_rng(&mut fake_rng),
            Kind::LastName => LastName().fake_with_rng(&mut fake_rng),
            Kind::Email => SafeEmail().fake_with_rng(&mut fake_rng),
            Kind::Company => CompanyName().fake_with_rng(&mut fake_rng),
        };
        Ok(MockValue::Text(value))
    }
}
