use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::errors::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
    Date,
    Array,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn new(key: &'static str, kind: ParamKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
        }
    }
}

/// Validated view over a generator's params.
pub struct ParamMap<'a> {
    map: &'a Map<String, Value>,
}

pub fn validate_params<'a>(
    params: &'a Map<String, Value>,
    specs: &[ParamSpec],
    ctx: &str,
) -> Result<ParamMap<'a>, GenerationError> {
    for (key, value) in params {
        let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
            return Err(GenerationError::InvalidParams(format!(
                "{ctx}: unknown param '{key}'"
            )));
        };
        validate_kind(ctx, key, spec.kind, value)?;
    }

    for spec in specs {
        if spec.required && !params.contains_key(spec.key) {
            return Err(GenerationError::InvalidParams(format!(
                "{ctx}: missing required param '{}'",
                spec.key
            )));
        }
    }

    Ok(ParamMap { map: params })
}

impl<'a> ParamMap<'a> {
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.map.get(key).and_then(Value::as_i64)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.map
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.map.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        self.get_str(key).and_then(parse_date_value)
    }

    pub fn get_array(&self, key: &str) -> Option<&'a [Value]> {
        self.map
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// Non-negative count, rejected with a message naming `ctx` otherwise.
    pub fn get_count(&self, key: &str, ctx: &str) -> Result<Option<u32>, GenerationError> {
        match self.get_i64(key) {
            None => Ok(None),
            Some(value) => u32::try_from(value).map(Some).map_err(|_| {
                GenerationError::InvalidParams(format!("{ctx}: {key} must fit u32 and be >= 0"))
            }),
        }
    }
}

fn validate_kind(
    ctx: &str,
    key: &str,
    kind: ParamKind,
    value: &Value,
) -> Result<(), GenerationError> {
    let valid = match kind {
        ParamKind::Bool => value.is_boolean(),
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Float => value.as_f64().is_some(),
        ParamKind::String => value.is_string(),
        ParamKind::Date => value.as_str().and_then(parse_date_value).is_some(),
        ParamKind::Array => value.as_array().is_some_and(|items| !items.is_empty()),
    };

    if valid {
        Ok(())
    } else {
        Err(GenerationError::InvalidParams(format!(
            "{ctx}: invalid value for param '{key}'"
        )))
    }
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Inclusive `(min, max)` pair, failing when the bounds cross.
pub fn ordered<T: PartialOrd>(min: T, max: T, ctx: &str) -> Result<(T, T), GenerationError> {
    if min > max {
        return Err(GenerationError::InvalidParams(format!(
            "{ctx}: min must be <= max"
        )));
    }
    Ok((min, max))
}
