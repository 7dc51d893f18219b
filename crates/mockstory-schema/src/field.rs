use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use mockstory_core::{Construct, GeneratorSpec, MockError, MockValue, Record, Result, Shape};

use crate::condition::Condition;

/// Computes a field from sibling values.
pub type DeriveFn = Arc<dyn Fn(&Record) -> MockValue + Send + Sync>;

/// Where a leaf field gets its value from.
#[derive(Clone)]
pub enum FieldSource {
    Literal(MockValue),
    Generator(GeneratorSpec),
    /// Function of the declared input fields.
    Derive { inputs: Vec<String>, derive: DeriveFn },
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            FieldSource::Generator(spec) => f.debug_tuple("Generator").field(spec).finish(),
            FieldSource::Derive { inputs, .. } => {
                f.debug_struct("Derive").field("inputs", inputs).finish()
            }
        }
    }
}

/// One arm of a conditional field.
#[derive(Debug, Clone)]
pub struct Branch {
    pub condition: Condition,
    pub then: FieldKind,
}

/// Rule tree for a field: a leaf source or branches over sibling values.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Leaf(FieldSource),
    Conditional {
        branches: Vec<Branch>,
        default: Option<Box<FieldKind>>,
    },
}

impl FieldKind {
    pub fn literal(value: impl Into<MockValue>) -> Self {
        FieldKind::Leaf(FieldSource::Literal(value.into()))
    }

    pub fn generator(spec: impl Into<GeneratorSpec>) -> Self {
        FieldKind::Leaf(FieldSource::Generator(spec.into()))
    }

    pub fn derive<F>(inputs: &[&str], derive: F) -> Self
    where
        F: Fn(&Record) -> MockValue + Send + Sync + 'static,
    {
        FieldKind::Leaf(FieldSource::Derive {
            inputs: inputs.iter().map(|input| input.to_string()).collect(),
            derive: Arc::new(derive),
        })
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, FieldKind::Conditional { .. })
    }

    /// Sibling fields this rule reads, derived from the rule tree alone.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(&mut dependencies);
        dependencies
    }

    fn collect_dependencies(&self, dependencies: &mut BTreeSet<String>) {
        match self {
            FieldKind::Leaf(FieldSource::Derive { inputs, .. }) => {
                dependencies.extend(inputs.iter().cloned());
            }
            FieldKind::Leaf(_) => {}
            FieldKind::Conditional { branches, default } => {
                for branch in branches {
                    dependencies.extend(branch.condition.fields());
                    branch.then.collect_dependencies(dependencies);
                }
                if let Some(default) = default {
                    default.collect_dependencies(dependencies);
                }
            }
        }
    }

    pub(crate) fn validate(&self, field: &str) -> Result<()> {
        match self {
            FieldKind::Leaf(_) => Ok(()),
            FieldKind::Conditional { branches, default } => {
                if branches.is_empty() {
                    return Err(MockError::InvalidSchema(format!(
                        "conditional field '{field}' has no branches"
                    )));
                }
                for branch in branches {
                    branch.condition.validate()?;
                    branch.then.validate(field)?;
                }
                match default {
                    Some(default) => default.validate(field),
                    None => Ok(()),
                }
            }
        }
    }
}

impl From<GeneratorSpec> for FieldKind {
    fn from(spec: GeneratorSpec) -> Self {
        FieldKind::generator(spec)
    }
}

impl<S: Shape> From<Construct<S>> for FieldKind {
    fn from(construct: Construct<S>) -> Self {
        FieldKind::generator(construct.into_generator())
    }
}

macro_rules! literal_kind {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for FieldKind {
                fn from(value: $source) -> Self {
                    FieldKind::literal(value)
                }
            }
        )*
    };
}

literal_kind!(
    MockValue,
    bool,
    i32,
    i64,
    f64,
    &str,
    String,
    NaiveDate,
    Vec<MockValue>,
);

/// Start a conditional rule: `when(cond, a).when(cond2, b).otherwise(c)`.
pub fn when(condition: Condition, then: impl Into<FieldKind>) -> ConditionalBuilder {
    ConditionalBuilder {
        branches: vec![Branch {
            condition,
            then: then.into(),
        }],
    }
}

/// Accumulates branches of a conditional rule.
#[derive(Debug, Clone)]
pub struct ConditionalBuilder {
    branches: Vec<Branch>,
}

impl ConditionalBuilder {
    pub fn when(mut self, condition: Condition, then: impl Into<FieldKind>) -> Self {
        self.branches.push(Branch {
            condition,
            then: then.into(),
        });
        self
    }

    pub fn otherwise(self, then: impl Into<FieldKind>) -> FieldKind {
        FieldKind::Conditional {
            branches: self.branches,
            default: Some(Box::new(then.into())),
        }
    }
}

impl From<ConditionalBuilder> for FieldKind {
    fn from(builder: ConditionalBuilder) -> Self {
        FieldKind::Conditional {
            branches: builder.branches,
            default: None,
        }
    }
}

/// A named schema field.
#[derive(Debug, Clone)]
pub struct FieldNode {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn dependencies(&self) -> BTreeSet<String> {
        self.kind.dependencies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockstory_core::generator::{future, past};

    #[test]
    fn conditional_dependencies_include_nested_rules() {
        let kind = when(Condition::eq("status", "expired"), past())
            .when(
                Condition::eq("status", "reserved"),
                when(Condition::gt("priority", 3), future()).otherwise(past()),
            )
            .otherwise(FieldKind::derive(&["created_at"], |record| {
                record.get("created_at").cloned().unwrap_or(MockValue::Null)
            }));

        let dependencies: Vec<String> = kind.dependencies().into_iter().collect();
        assert_eq!(dependencies, ["created_at", "priority", "status"]);
    }

    #[test]
    fn leaf_generators_have_no_dependencies() {
        let node = FieldNode::new("expiration", future());
        assert!(node.dependencies().is_empty());
        assert!(!node.kind.is_conditional());
    }

    #[test]
    fn empty_conditional_is_invalid() {
        let kind = FieldKind::Conditional {
            branches: Vec::new(),
            default: None,
        };
        assert!(matches!(
            kind.validate("status"),
            Err(MockError::InvalidSchema(_))
        ));
    }
}
