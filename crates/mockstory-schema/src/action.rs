use std::fmt;
use std::sync::Arc;

use mockstory_core::{MockValue, Record};

use crate::schema::SchemaBuilder;

/// Event that fires a relationship action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    Add,
    Remove,
    Change,
    Custom(String),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Add => f.write_str("add"),
            Trigger::Remove => f.write_str("remove"),
            Trigger::Change => f.write_str("change"),
            Trigger::Custom(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Trigger {
    fn from(value: &str) -> Self {
        match value {
            "add" => Trigger::Add,
            "remove" => Trigger::Remove,
            "change" => Trigger::Change,
            other => Trigger::Custom(other.to_string()),
        }
    }
}

pub type AccessorFn = Arc<dyn Fn(&Record) -> Option<MockValue> + Send + Sync>;

/// Reads an identity or display name out of a record.
#[derive(Clone)]
pub enum Accessor {
    Field(String),
    Custom(AccessorFn),
}

impl Accessor {
    pub fn field(name: &str) -> Self {
        Accessor::Field(name.to_string())
    }

    pub fn custom<F>(accessor: F) -> Self
    where
        F: Fn(&Record) -> Option<MockValue> + Send + Sync + 'static,
    {
        Accessor::Custom(Arc::new(accessor))
    }

    /// Value for `record`; null values count as absent.
    pub fn get(&self, record: &Record) -> Option<MockValue> {
        let value = match self {
            Accessor::Field(name) => record.get(name).cloned(),
            Accessor::Custom(accessor) => accessor(record),
        };
        value.filter(|value| !value.is_null())
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            Accessor::Field(name) => Some(name.as_str()),
            Accessor::Custom(_) => None,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Accessor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(value: &str) -> Self {
        Accessor::field(value)
    }
}

/// Callback with mutable access to the owner's values.
pub type EffectFn = Arc<dyn Fn(&mut Record, &Record) + Send + Sync>;

/// What an action does to the owner record.
#[derive(Clone)]
pub enum Effect {
    /// Append the related record to a list field.
    Push { field: String },
    /// Remove list elements whose id matches the related record.
    Delete { field: String },
    /// Replace the element with a matching id, or append.
    Upsert { field: String },
    /// Replace elements with a matching id.
    Update { field: String },
    /// Clear a list field.
    Empty { field: String },
    Custom(EffectFn),
}

impl Effect {
    pub fn field(&self) -> Option<&str> {
        match self {
            Effect::Push { field }
            | Effect::Delete { field }
            | Effect::Upsert { field }
            | Effect::Update { field }
            | Effect::Empty { field } => Some(field.as_str()),
            Effect::Custom(_) => None,
        }
    }

    pub fn needs_identity(&self) -> bool {
        matches!(
            self,
            Effect::Delete { .. } | Effect::Upsert { .. } | Effect::Update { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Effect::Push { .. } => "push",
            Effect::Delete { .. } => "delete",
            Effect::Upsert { .. } => "upsert",
            Effect::Update { .. } => "update",
            Effect::Empty { .. } => "empty",
            Effect::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Some(field) => write!(f, "{}({field})", self.label()),
            None => f.write_str("custom(..)"),
        }
    }
}

/// Declarative relationship between an owner schema and a related schema.
#[derive(Debug, Clone)]
pub struct RelationAction {
    pub trigger: Trigger,
    pub related: String,
    /// Overrides the related schema's id accessor.
    pub id: Option<Accessor>,
    pub effect: Effect,
}

impl RelationAction {
    pub fn matches(&self, trigger: &Trigger, related: &str) -> bool {
        self.trigger == *trigger && self.related == related
    }
}

/// Fluent declaration of an action, started with [`SchemaBuilder::on`].
#[must_use]
pub struct ActionBuilder {
    schema: SchemaBuilder,
    trigger: Trigger,
    related: String,
    id: Option<Accessor>,
}

impl ActionBuilder {
    pub(crate) fn new(schema: SchemaBuilder, trigger: Trigger, related: String) -> Self {
        Self {
            schema,
            trigger,
            related,
            id: None,
        }
    }

    /// Id accessor for this action only.
    pub fn id(mut self, accessor: impl Into<Accessor>) -> Self {
        self.id = Some(accessor.into());
        self
    }

    /// Target a field of the owner.
    pub fn field(self, field: &str) -> FieldActionBuilder {
        FieldActionBuilder {
            action: self,
            field: field.to_string(),
        }
    }

    /// Register a custom effect.
    pub fn run<F>(self, effect: F) -> SchemaBuilder
    where
        F: Fn(&mut Record, &Record) + Send + Sync + 'static,
    {
        self.finish(Effect::Custom(Arc::new(effect)))
    }

    fn finish(self, effect: Effect) -> SchemaBuilder {
        let ActionBuilder {
            schema,
            trigger,
            related,
            id,
        } = self;
        schema.push_action(RelationAction {
            trigger,
            related,
            id,
            effect,
        })
    }
}

#[must_use]
pub struct FieldActionBuilder {
    action: ActionBuilder,
    field: String,
}

impl FieldActionBuilder {
    /// Treat the field as a list of related records.
    pub fn array(self) -> ArrayActionBuilder {
        ArrayActionBuilder {
            action: self.action,
            field: self.field,
        }
    }
}

/// Built-in effects over a list field.
#[must_use]
pub struct ArrayActionBuilder {
    action: ActionBuilder,
    field: String,
}

impl ArrayActionBuilder {
    pub fn push(self) -> SchemaBuilder {
        let field = self.field;
        self.action.finish(Effect::Push { field })
    }

    pub fn delete(self) -> SchemaBuilder {
        let field = self.field;
        self.action.finish(Effect::Delete { field })
    }

    pub fn empty(self) -> SchemaBuilder {
        let field = self.field;
        self.action.finish(Effect::Empty { field })
    }

    /// Keep the list in sync with the related schema, keyed by id.
    ///
    /// Answers add (upsert), remove (delete) and change (update); the
    /// trigger given to `on` is not consulted.
    pub fn auto(self) -> SchemaBuilder {
        let ArrayActionBuilder { action, field } = self;
        let ActionBuilder {
            mut schema,
            related,
            id,
            ..
        } = action;
        for (trigger, effect) in [
            (Trigger::Add, Effect::Upsert { field: field.clone() }),
            (Trigger::Remove, Effect::Delete { field: field.clone() }),
            (Trigger::Change, Effect::Update { field: field.clone() }),
        ] {
            schema = schema.push_action(RelationAction {
                trigger,
                related: related.clone(),
                id: id.clone(),
                effect,
            });
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_parses_builtin_names() {
        assert_eq!(Trigger::from("add"), Trigger::Add);
        assert_eq!(Trigger::from("change"), Trigger::Change);
        assert_eq!(Trigger::from("redeem"), Trigger::Custom("redeem".to_string()));
        assert_eq!(Trigger::Custom("redeem".to_string()).to_string(), "redeem");
    }

    #[test]
    fn accessor_treats_null_as_absent() {
        let mut record = Record::new();
        record.insert("id".to_string(), MockValue::Null);
        record.insert("code".to_string(), MockValue::Text("C1".into()));

        assert_eq!(Accessor::field("id").get(&record), None);
        let custom = Accessor::custom(|record| record.get("code").cloned());
        assert_eq!(custom.get(&record), Some(MockValue::Text("C1".into())));
    }
}
