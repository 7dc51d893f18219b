use rand::distr::Uniform;
use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;
use serde_json::{Map, Value};

use mockstory_core::MockValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, ordered, validate_params};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 10000;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_MAX: f64 = 10000.0;
const DEFAULT_TEXT_MIN: u32 = 1;
const DEFAULT_TEXT_MAX: u32 = 16;
const DEFAULT_MAX_REPEAT: u32 = 32;
const DEFAULT_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BOOL_PARAMS: &[ParamSpec] = &[ParamSpec::new("probability", ParamKind::Float, false)];
const INT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
    ParamSpec::new("parity", ParamKind::String, false),
];
const FLOAT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Float, false),
    ParamSpec::new("max", ParamKind::Float, false),
    ParamSpec::new("decimals", ParamKind::Int, false),
];
const TEXT_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
    ParamSpec::new("charset", ParamKind::String, false),
];
const TEXT_PATTERN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("pattern", ParamKind::String, true),
    ParamSpec::new("max_repeat", ParamKind::Int, false),
];
const TEXT_LOREM_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
];
const CHOICE_PARAMS: &[ParamSpec] = &[ParamSpec::new("values", ParamKind::Array, true)];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(BoolGenerator));
    registry.register_generator(Box::new(IntRangeGenerator));
    registry.register_generator(Box::new(FloatRangeGenerator));
    registry.register_generator(Box::new(TextCharsGenerator));
    registry.register_generator(Box::new(TextPatternGenerator));
    registry.register_generator(Box::new(TextLoremGenerator));
    registry.register_generator(Box::new(ChoiceGenerator));
    registry.register_generator(Box::new(UuidGenerator));
}

struct BoolGenerator;

impl Generator for BoolGenerator {
    fn id(&self) -> &'static str {
        "bool"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, BOOL_PARAMS, self.id())?;
        let probability = params.get_f64("probability").unwrap_or(0.5);
        if !(0.0..=1.0).contains(&probability) {
            return Err(GenerationError::InvalidParams(
                "bool: probability must be within 0..=1".to_string(),
            ));
        }
        Ok(MockValue::Bool(rng.random_bool(probability)))
    }
}

struct IntRangeGenerator;

impl Generator for IntRangeGenerator {
    fn id(&self) -> &'static str {
        "number.int"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, INT_PARAMS, self.id())?;
        let (min, max) = ordered(
            params.get_i64("min").unwrap_or(DEFAULT_INT_MIN),
            params.get_i64("max").unwrap_or(DEFAULT_INT_MAX),
            self.id(),
        )?;

        let remainder = match params.get_str("parity") {
            None => return Ok(MockValue::Int(rng.random_range(min..=max))),
            Some("even") => 0,
            Some("odd") => 1,
            Some(other) => {
                return Err(GenerationError::InvalidParams(format!(
                    "number.int: unknown parity '{other}'"
                )));
            }
        };

        // Smallest value of the requested parity, then step by two. Widened so
        // neither end of the i64 range saturates.
        let (low, high) = (i128::from(min), i128::from(max));
        let first = if low.rem_euclid(2) == remainder {
            low
        } else {
            low + 1
        };
        if first > high {
            return Err(GenerationError::InvalidParams(format!(
                "number.int: no {} value within {min}..={max}",
                if remainder == 0 { "even" } else { "odd" }
            )));
        }
        let steps = u64::try_from((high - first) / 2).map_err(|_| {
            GenerationError::InvalidParams(format!("number.int: range {min}..={max} is too wide"))
        })?;
        let offset = rng.random_range(0..=steps);
        let value = i64::try_from(first + i128::from(offset) * 2).map_err(|_| {
            GenerationError::InvalidParams(format!("number.int: value outside {min}..={max}"))
        })?;
        Ok(MockValue::Int(value))
    }
}

struct FloatRangeGenerator;

impl Generator for FloatRangeGenerator {
    fn id(&self) -> &'static str {
        "number.float"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, FLOAT_PARAMS, self.id())?;
        let (min, max) = ordered(
            params.get_f64("min").unwrap_or(DEFAULT_FLOAT_MIN),
            params.get_f64("max").unwrap_or(DEFAULT_FLOAT_MAX),
            self.id(),
        )?;
        let range = Uniform::new_inclusive(min, max).map_err(|err| {
            GenerationError::InvalidParams(format!("number.float: range {min}..={max}: {err}"))
        })?;
        let value = rng.sample(range);
        let value = match params.get_count("decimals", self.id())? {
            Some(decimals) => {
                let factor = 10_f64.powi(decimals.min(15) as i32);
                ((value * factor).round() / factor).clamp(min, max)
            }
            None => value,
        };
        Ok(MockValue::Float(value))
    }
}

struct TextCharsGenerator;

impl Generator for TextCharsGenerator {
    fn id(&self) -> &'static str {
        "text.chars"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, TEXT_PARAMS, self.id())?;
        let (min_len, max_len) = ordered(
            params.get_count("min", self.id())?.unwrap_or(DEFAULT_TEXT_MIN),
            params.get_count("max", self.id())?.unwrap_or(DEFAULT_TEXT_MAX),
            self.id(),
        )?;
        let chars: Vec<char> = params
            .get_str("charset")
            .unwrap_or(DEFAULT_CHARSET)
            .chars()
            .collect();
        if chars.is_empty() {
            return Err(GenerationError::InvalidParams(
                "text.chars: charset must not be empty".to_string(),
            ));
        }

        let len = rng.random_range(min_len..=max_len) as usize;
        let mut value = String::with_capacity(len);
        for _ in 0..len {
            value.push(chars[rng.random_range(0..chars.len())]);
        }
        Ok(MockValue::Text(value))
    }
}

struct TextPatternGenerator;

impl Generator for TextPatternGenerator {
    fn id(&self) -> &'static str {
        "text.pattern"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, TEXT_PATTERN_PARAMS, self.id())?;
        let pattern = params.get_str("pattern").ok_or_else(|| {
            GenerationError::InvalidParams("text.pattern requires params.pattern".to_string())
        })?;
        let max_repeat = match params.get_count("max_repeat", self.id())? {
            Some(0) => {
                return Err(GenerationError::InvalidParams(
                    "text.pattern: max_repeat must be > 0".to_string(),
                ));
            }
            Some(value) => value,
            None => DEFAULT_MAX_REPEAT,
        };
        let regex = RandRegex::compile(pattern, max_repeat).map_err(|err| {
            GenerationError::InvalidParams(format!("text.pattern: invalid pattern: {err}"))
        })?;
        let value: String = rng.sample(regex);
        Ok(MockValue::Text(value))
    }
}

struct TextLoremGenerator;

impl Generator for TextLoremGenerator {
    fn id(&self) -> &'static str {
        "text.lorem"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, TEXT_LOREM_PARAMS, self.id())?;
        let (min_words, max_words) = ordered(
            params.get_count("min", self.id())?.unwrap_or(3),
            params.get_count("max", self.id())?.unwrap_or(8),
            self.id(),
        )?;
        let words = rng.random_range(min_words..=max_words) as usize;

        let mut value = String::new();
        for idx in 0..words {
            if idx > 0 {
                value.push(' ');
            }
            value.push_str(LOREM_WORDS[rng.random_range(0..LOREM_WORDS.len())]);
        }
        Ok(MockValue::Text(value))
    }
}

struct ChoiceGenerator;

impl Generator for ChoiceGenerator {
    fn id(&self) -> &'static str {
        "choice"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, CHOICE_PARAMS, self.id())?;
        let values = params.get_array("values").unwrap_or_default();
        if values.is_empty() {
            return Err(GenerationError::InvalidParams(
                "choice: values must not be empty".to_string(),
            ));
        }
        let idx = rng.random_range(0..values.len());
        Ok(MockValue::from_json(&values[idx]))
    }
}

struct UuidGenerator;

impl Generator for UuidGenerator {
    fn id(&self) -> &'static str {
        "uuid"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        validate_params(params, &[], self.id())?;
        Ok(MockValue::Uuid(random_uuid(rng)))
    }
}

/// Version 4 uuid drawn from `rng`.
pub(crate) fn random_uuid(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    uuid::Uuid::from_bytes(bytes).to_string()
}

const LOREM_WORDS: &[&str] = &[
    "lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];
