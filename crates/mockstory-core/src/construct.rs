//! Fluent, persistent constraint builders.
//!
//! A [`Construct`] accumulates constraints for one generator. Every chained
//! call returns a new builder, so a partially configured builder can be
//! reused for several fields. Values are checked against the fixed [`Rule`]
//! as soon as they are set.

use std::fmt;
use std::marker::PhantomData;

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};

use crate::error::{MockError, Result};
use crate::generator::GeneratorSpec;

/// Fixed bounds a construct may never leave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule<B> {
    pub min: Option<B>,
    pub max: Option<B>,
}

impl<B> Rule<B> {
    pub fn new(min: Option<B>, max: Option<B>) -> Self {
        Self { min, max }
    }

    pub fn range(min: B, max: B) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl<B> Default for Rule<B> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

/// Constraint shape backing a construct: bound type, encoding and generator id.
pub trait Shape: Clone {
    type Bound: Copy + PartialOrd + fmt::Display;

    const GENERATOR_ID: &'static str;

    /// JSON form of a bound; `None` when the bound has no JSON form.
    fn encode(bound: Self::Bound) -> Option<Value>;

    fn decode(value: &Value) -> Option<Self::Bound>;
}

/// Integer range with optional parity.
#[derive(Debug, Clone, Copy)]
pub struct IntShape;

/// Floating point range with optional precision.
#[derive(Debug, Clone, Copy)]
pub struct FloatShape;

/// Text length range with optional charset.
#[derive(Debug, Clone, Copy)]
pub struct TextShape;

/// Calendar date range.
#[derive(Debug, Clone, Copy)]
pub struct DateShape;

impl Shape for IntShape {
    type Bound = i64;

    const GENERATOR_ID: &'static str = "number.int";

    fn encode(bound: i64) -> Option<Value> {
        Some(Value::from(bound))
    }

    fn decode(value: &Value) -> Option<i64> {
        value.as_i64()
    }
}

impl Shape for FloatShape {
    type Bound = f64;

    const GENERATOR_ID: &'static str = "number.float";

    fn encode(bound: f64) -> Option<Value> {
        Number::from_f64(bound).map(Value::Number)
    }

    fn decode(value: &Value) -> Option<f64> {
        value.as_f64()
    }
}

impl Shape for TextShape {
    type Bound = u64;

    const GENERATOR_ID: &'static str = "text.chars";

    fn encode(bound: u64) -> Option<Value> {
        Some(Value::from(bound))
    }

    fn decode(value: &Value) -> Option<u64> {
        value.as_u64()
    }
}

impl Shape for DateShape {
    type Bound = NaiveDate;

    const GENERATOR_ID: &'static str = "date.between";

    fn encode(bound: NaiveDate) -> Option<Value> {
        Some(Value::String(bound.format("%Y-%m-%d").to_string()))
    }

    fn decode(value: &Value) -> Option<NaiveDate> {
        value
            .as_str()
            .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
    }
}

/// Persistent builder accumulating constraints for shape `S`.
#[derive(Debug, Clone, PartialEq)]
pub struct Construct<S: Shape> {
    rule: Rule<S::Bound>,
    constraints: Map<String, Value>,
    shape: PhantomData<S>,
}

/// Integer range builder.
pub type RangeConstruct = Construct<IntShape>;

pub fn int() -> Construct<IntShape> {
    Construct::new()
}

pub fn float() -> Construct<FloatShape> {
    Construct::new()
}

pub fn text() -> Construct<TextShape> {
    Construct::new()
}

pub fn date() -> Construct<DateShape> {
    Construct::new()
}

impl<S: Shape> Default for Construct<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Shape> Construct<S> {
    pub fn new() -> Self {
        Self {
            rule: Rule::default(),
            constraints: Map::new(),
            shape: PhantomData,
        }
    }

    /// Builder confined to `rule`. Bounds must be representable and ordered.
    pub fn with_rule(rule: Rule<S::Bound>) -> Result<Self> {
        for (key, bound) in [("rule min", rule.min), ("rule max", rule.max)] {
            if let Some(bound) = bound {
                encoded::<S>(key, bound)?;
            }
        }
        if let (Some(min), Some(max)) = (rule.min, rule.max)
            && min > max
        {
            return Err(violation("rule max", max, "rule min", min));
        }
        Ok(Self {
            rule,
            constraints: Map::new(),
            shape: PhantomData,
        })
    }

    pub fn rule(&self) -> &Rule<S::Bound> {
        &self.rule
    }

    /// Constraints set through the builder, without the rule defaults.
    pub fn constraints(&self) -> &Map<String, Value> {
        &self.constraints
    }

    /// Merge one constraint into a copy of this builder.
    pub fn set(&self, key: &str, value: Value) -> Self {
        let mut next = self.clone();
        next.constraints.insert(key.to_string(), value);
        next
    }

    pub fn min(&self, value: S::Bound) -> Result<Self> {
        let encoded = encoded::<S>("min", value)?;
        if let Some(limit) = self.rule.min
            && value < limit
        {
            return Err(violation("min", value, "rule min", limit));
        }
        if let Some(limit) = self.effective_max()
            && value > limit
        {
            return Err(violation("min", value, "max", limit));
        }
        Ok(self.set("min", encoded))
    }

    pub fn max(&self, value: S::Bound) -> Result<Self> {
        let encoded = encoded::<S>("max", value)?;
        if let Some(limit) = self.rule.max
            && value > limit
        {
            return Err(violation("max", value, "rule max", limit));
        }
        if let Some(limit) = self.effective_min()
            && value < limit
        {
            return Err(violation("max", value, "min", limit));
        }
        Ok(self.set("max", encoded))
    }

    pub fn between(&self, min: S::Bound, max: S::Bound) -> Result<Self> {
        self.min(min)?.max(max)
    }

    /// Build the generator; unset bounds fall back to the rule.
    pub fn into_generator(self) -> GeneratorSpec {
        let mut params = self.constraints;
        for (key, bound) in [("min", self.rule.min), ("max", self.rule.max)] {
            if let Some(bound) = bound
                && !params.contains_key(key)
                && let Some(value) = S::encode(bound)
            {
                params.insert(key.to_string(), value);
            }
        }
        GeneratorSpec {
            id: S::GENERATOR_ID.to_string(),
            params,
        }
    }

    fn current(&self, key: &str) -> Option<S::Bound> {
        self.constraints.get(key).and_then(S::decode)
    }

    fn effective_min(&self) -> Option<S::Bound> {
        tighter(self.rule.min, self.current("min"), |current, rule| {
            current > rule
        })
    }

    fn effective_max(&self) -> Option<S::Bound> {
        tighter(self.rule.max, self.current("max"), |current, rule| {
            current < rule
        })
    }
}

impl Construct<IntShape> {
    pub fn even(&self) -> Self {
        self.set("parity", Value::from("even"))
    }

    pub fn odd(&self) -> Self {
        self.set("parity", Value::from("odd"))
    }
}

impl Construct<FloatShape> {
    pub fn decimals(&self, digits: u32) -> Self {
        self.set("decimals", Value::from(digits))
    }
}

impl Construct<TextShape> {
    pub fn charset(&self, charset: &str) -> Self {
        self.set("charset", Value::from(charset))
    }
}

impl Construct<DateShape> {
    pub fn year(&self, year: i32) -> Self {
        self.set("year", Value::from(year))
    }
}

impl<S: Shape> From<Construct<S>> for GeneratorSpec {
    fn from(construct: Construct<S>) -> Self {
        construct.into_generator()
    }
}

fn tighter<B: Copy>(
    rule: Option<B>,
    current: Option<B>,
    prefer_current: impl Fn(B, B) -> bool,
) -> Option<B> {
    match (rule, current) {
        (Some(rule), Some(current)) => Some(if prefer_current(current, rule) {
            current
        } else {
            rule
        }),
        (rule, current) => current.or(rule),
    }
}

/// Encode a bound, rejecting values that cannot be ordered or stored.
fn encoded<S: Shape>(key: &str, value: S::Bound) -> Result<Value> {
    let comparable = value.partial_cmp(&value).is_some();
    match S::encode(value) {
        Some(encoded) if comparable => Ok(encoded),
        _ => Err(MockError::InvalidBound {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn violation<B: fmt::Display>(key: &str, value: B, bound: &str, limit: B) -> MockError {
    MockError::RuleViolation {
        key: key.to_string(),
        value: value.to_string(),
        bound: bound.to_string(),
        limit: limit.to_string(),
    }
}
