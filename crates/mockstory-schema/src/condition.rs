use std::cmp::Ordering;
use std::collections::BTreeSet;

use regex::Regex;

use mockstory_core::{MockError, MockValue, Record, Result};

/// Predicate over already-resolved sibling fields.
///
/// Every field a condition reads is visible through [`Condition::fields`],
/// which is how the dependency graph learns about it before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always,
    Eq(String, MockValue),
    Ne(String, MockValue),
    In(String, Vec<MockValue>),
    Gt(String, MockValue),
    Ge(String, MockValue),
    Lt(String, MockValue),
    Le(String, MockValue),
    IsNull(String),
    Matches(String, Pattern),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn eq(field: &str, value: impl Into<MockValue>) -> Self {
        Condition::Eq(field.to_string(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<MockValue>) -> Self {
        Condition::Ne(field.to_string(), value.into())
    }

    pub fn one_of<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<MockValue>,
    {
        Condition::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn gt(field: &str, value: impl Into<MockValue>) -> Self {
        Condition::Gt(field.to_string(), value.into())
    }

    pub fn ge(field: &str, value: impl Into<MockValue>) -> Self {
        Condition::Ge(field.to_string(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<MockValue>) -> Self {
        Condition::Lt(field.to_string(), value.into())
    }

    pub fn le(field: &str, value: impl Into<MockValue>) -> Self {
        Condition::Le(field.to_string(), value.into())
    }

    pub fn is_null(field: &str) -> Self {
        Condition::IsNull(field.to_string())
    }

    pub fn matches(field: &str, pattern: &str) -> Self {
        Condition::Matches(field.to_string(), Pattern::new(pattern))
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut parts) => {
                parts.push(other);
                Condition::Or(parts)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }

    /// Field names read by this condition.
    pub fn fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            Condition::Always => {}
            Condition::Eq(field, _)
            | Condition::Ne(field, _)
            | Condition::In(field, _)
            | Condition::Gt(field, _)
            | Condition::Ge(field, _)
            | Condition::Lt(field, _)
            | Condition::Le(field, _)
            | Condition::IsNull(field)
            | Condition::Matches(field, _) => {
                fields.insert(field.clone());
            }
            Condition::And(parts) | Condition::Or(parts) => {
                for part in parts {
                    part.collect_fields(fields);
                }
            }
            Condition::Not(inner) => inner.collect_fields(fields),
        }
    }

    /// Reject patterns that cannot compile, before any resolution happens.
    pub fn validate(&self) -> Result<()> {
        match self {
            Condition::Matches(field, pattern) => pattern.compiled(field).map(|_| ()),
            Condition::And(parts) | Condition::Or(parts) => {
                parts.iter().try_for_each(Condition::validate)
            }
            Condition::Not(inner) => inner.validate(),
            _ => Ok(()),
        }
    }

    /// Evaluate for `owner` against the resolved record.
    ///
    /// Reading a field missing from `resolved` is an ordering bug and
    /// surfaces as [`MockError::UnresolvedDependency`].
    pub fn evaluate(&self, owner: &str, resolved: &Record) -> Result<bool> {
        match self {
            Condition::Always => Ok(true),
            Condition::Eq(field, expected) => {
                Ok(same_value(lookup(owner, field, resolved)?, expected))
            }
            Condition::Ne(field, expected) => {
                Ok(!same_value(lookup(owner, field, resolved)?, expected))
            }
            Condition::In(field, values) => {
                let value = lookup(owner, field, resolved)?;
                Ok(values.iter().any(|candidate| same_value(candidate, value)))
            }
            Condition::Gt(field, bound) => compare(owner, field, bound, resolved, |ordering| {
                ordering == Ordering::Greater
            }),
            Condition::Ge(field, bound) => compare(owner, field, bound, resolved, |ordering| {
                ordering != Ordering::Less
            }),
            Condition::Lt(field, bound) => compare(owner, field, bound, resolved, |ordering| {
                ordering == Ordering::Less
            }),
            Condition::Le(field, bound) => compare(owner, field, bound, resolved, |ordering| {
                ordering != Ordering::Greater
            }),
            Condition::IsNull(field) => Ok(lookup(owner, field, resolved)?.is_null()),
            Condition::Matches(field, pattern) => {
                let value = lookup(owner, field, resolved)?;
                let regex = pattern.compiled(field)?;
                Ok(value.as_str().is_some_and(|text| regex.is_match(text)))
            }
            Condition::And(parts) => {
                for part in parts {
                    if !part.evaluate(owner, resolved)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(parts) => {
                for part in parts {
                    if part.evaluate(owner, resolved)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(inner) => Ok(!inner.evaluate(owner, resolved)?),
        }
    }
}

/// Regex source compiled once, when the condition is built.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: std::result::Result<Regex, String>,
}

impl Pattern {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            compiled: Regex::new(source).map_err(|err| err.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn compiled(&self, field: &str) -> Result<&Regex> {
        self.compiled.as_ref().map_err(|err| {
            MockError::InvalidSchema(format!("invalid pattern for condition on '{field}': {err}"))
        })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Text and uuid values compare by their string form.
fn same_value(left: &MockValue, right: &MockValue) -> bool {
    match (left.as_str(), right.as_str()) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

fn lookup<'r>(owner: &str, field: &str, resolved: &'r Record) -> Result<&'r MockValue> {
    resolved
        .get(field)
        .ok_or_else(|| MockError::UnresolvedDependency {
            field: owner.to_string(),
            dependency: field.to_string(),
        })
}

fn compare(
    owner: &str,
    field: &str,
    bound: &MockValue,
    resolved: &Record,
    accept: impl Fn(Ordering) -> bool,
) -> Result<bool> {
    let value = lookup(owner, field, resolved)?;
    Ok(value.compare(bound).is_some_and(accept))
}
