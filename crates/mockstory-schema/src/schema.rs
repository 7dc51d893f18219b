use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use mockstory_core::{DependencyGraph, MockError, Result};

use crate::action::{Accessor, ActionBuilder, RelationAction, Trigger};
use crate::field::{FieldKind, FieldNode};
use crate::overrides::OverrideSet;

/// Named record shape: fields, keyword presets, accessors and actions.
///
/// A schema is immutable once built and cheap to clone; clones share the
/// same definition. Overrides never touch it, they only shape a
/// [`ResolutionPlan`].
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug)]
struct SchemaInner {
    name: String,
    fields: Vec<FieldNode>,
    index: BTreeMap<String, usize>,
    graph: DependencyGraph,
    keywords: BTreeMap<String, Keyword>,
    id: Option<Accessor>,
    name_accessor: Option<Accessor>,
    actions: Vec<RelationAction>,
}

#[derive(Debug)]
struct Keyword {
    overrides: OverrideSet,
    /// Evaluation order when the preset introduces dependencies.
    order: Option<Vec<String>>,
}

/// One field to evaluate, with the rule that applies to it.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub field: String,
    pub kind: FieldKind,
    pub overridden: bool,
}

/// Evaluation order plus effective rules for one resolution call.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    pub keyword: Option<String>,
    pub steps: Vec<PlanStep>,
    /// True when the overrides forced a fresh dependency graph.
    pub rebuilt: bool,
    /// Override fields skipped because the schema does not declare them.
    pub skipped: Vec<String>,
}

impl ResolutionPlan {
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.field.as_str()).collect()
    }

    pub fn overridden(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(|step| step.overridden)
            .map(|step| step.field.as_str())
    }
}

impl Schema {
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldNode] {
        &self.inner.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.inner
            .index
            .get(name)
            .and_then(|position| self.inner.fields.get(*position))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    /// Memoised evaluation order without overrides.
    pub fn order(&self) -> &[String] {
        self.inner.graph.order()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.inner.graph
    }

    pub fn keyword(&self, name: &str) -> Option<&OverrideSet> {
        self.inner.keywords.get(name).map(|keyword| &keyword.overrides)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.inner.keywords.keys().map(String::as_str)
    }

    pub fn id_accessor(&self) -> Option<&Accessor> {
        self.inner.id.as_ref()
    }

    pub fn name_accessor(&self) -> Option<&Accessor> {
        self.inner.name_accessor.as_ref()
    }

    pub fn actions(&self) -> &[RelationAction] {
        &self.inner.actions
    }

    /// Actions answering `trigger` for `related`, in declaration order.
    pub fn actions_for(&self, trigger: &Trigger, related: &str) -> Vec<&RelationAction> {
        self.inner
            .actions
            .iter()
            .filter(|action| action.matches(trigger, related))
            .collect()
    }

    /// True when both handles share one definition.
    pub fn same_as(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Derive the plan for one resolution call.
    ///
    /// Keyword overrides apply first and `overrides` are layered on top. The
    /// memoised order is reused unless the ad-hoc overrides read sibling
    /// fields. Unknown override fields fail in strict mode and are skipped
    /// otherwise.
    pub fn plan(
        &self,
        keyword: Option<&str>,
        overrides: &OverrideSet,
        strict: bool,
    ) -> Result<ResolutionPlan> {
        let preset = match keyword {
            Some(name) => Some(self.inner.keywords.get(name).ok_or_else(|| {
                MockError::UnknownKeyword {
                    schema: self.name().to_string(),
                    keyword: name.to_string(),
                }
            })?),
            None => None,
        };

        let mut skipped = Vec::new();
        let mut adhoc = OverrideSet::new();
        for (field, kind) in overrides.entries() {
            if !self.has_field(field) {
                if strict {
                    return Err(self.unknown_field(field));
                }
                warn!(schema = %self.name(), field = %field, "skipping override for unknown field");
                skipped.push(field.clone());
                continue;
            }
            kind.validate(field)?;
            adhoc.push(field, kind.clone());
        }

        let combined = match preset {
            Some(preset) => preset.overrides.layered(&adhoc),
            None => adhoc.clone(),
        };
        let effective = combined.effective();

        let rebuilt = adhoc.has_dependencies();
        let order: Vec<String> = if rebuilt {
            debug!(
                schema = %self.name(),
                keyword = keyword.unwrap_or_default(),
                "rebuilding dependency graph for overrides"
            );
            self.graph_with(&effective)?.order().to_vec()
        } else if let Some(order) = preset.and_then(|preset| preset.order.as_ref()) {
            order.clone()
        } else {
            self.order().to_vec()
        };

        let steps = order
            .into_iter()
            .map(|field| {
                let (kind, overridden) = match effective.get(field.as_str()) {
                    Some(kind) => ((*kind).clone(), true),
                    None => (self.declared_kind(&field)?.clone(), false),
                };
                Ok(PlanStep {
                    field,
                    kind,
                    overridden,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolutionPlan {
            keyword: keyword.map(str::to_string),
            steps,
            rebuilt,
            skipped,
        })
    }

    fn declared_kind(&self, field: &str) -> Result<&FieldKind> {
        self.field(field)
            .map(|node| &node.kind)
            .ok_or_else(|| self.unknown_field(field))
    }

    fn graph_with(&self, effective: &BTreeMap<&str, &FieldKind>) -> Result<DependencyGraph> {
        graph_with(&self.inner.fields, effective)
    }

    fn unknown_field(&self, field: &str) -> MockError {
        MockError::UnknownField {
            schema: self.name().to_string(),
            field: field.to_string(),
        }
    }
}

fn graph_with(
    fields: &[FieldNode],
    effective: &BTreeMap<&str, &FieldKind>,
) -> Result<DependencyGraph> {
    DependencyGraph::build(fields.iter().map(|node| {
        let dependencies = match effective.get(node.name.as_str()) {
            Some(kind) => kind.dependencies(),
            None => node.dependencies(),
        };
        (node.name.clone(), dependencies)
    }))
}

/// Fluent schema declaration. Nothing is validated until [`build`](Self::build).
#[must_use]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldNode>,
    keywords: Vec<(String, OverrideSet)>,
    id: Option<Accessor>,
    name_accessor: Option<Accessor>,
    actions: Vec<RelationAction>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            keywords: Vec::new(),
            id: None,
            name_accessor: None,
            actions: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, kind: impl Into<FieldKind>) -> Self {
        self.fields.push(FieldNode::new(name, kind));
        self
    }

    /// Declare a named override preset.
    pub fn keyword(mut self, name: &str, overrides: OverrideSet) -> Self {
        self.keywords.push((name.to_string(), overrides));
        self
    }

    /// Identity of instances, used by id-keyed actions and story slots.
    pub fn id(mut self, accessor: impl Into<Accessor>) -> Self {
        self.id = Some(accessor.into());
        self
    }

    /// Display name of instances, preferred for story slots.
    pub fn name(mut self, accessor: impl Into<Accessor>) -> Self {
        self.name_accessor = Some(accessor.into());
        self
    }

    /// Declare what happens to this schema's instances when `trigger`
    /// fires with an instance of the `related` schema.
    pub fn on(self, trigger: impl Into<Trigger>, related: &str) -> ActionBuilder {
        ActionBuilder::new(self, trigger.into(), related.to_string())
    }

    pub(crate) fn push_action(mut self, action: RelationAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn build(self) -> Result<Schema> {
        if self.name.trim().is_empty() {
            return Err(MockError::InvalidSchema(
                "schema name must not be empty".to_string(),
            ));
        }

        for node in &self.fields {
            node.kind.validate(&node.name)?;
        }
        let graph = DependencyGraph::build(
            self.fields
                .iter()
                .map(|node| (node.name.clone(), node.dependencies())),
        )?;
        let index: BTreeMap<String, usize> = self
            .fields
            .iter()
            .enumerate()
            .map(|(position, node)| (node.name.clone(), position))
            .collect();

        let unknown = |field: &str| MockError::UnknownField {
            schema: self.name.clone(),
            field: field.to_string(),
        };

        let mut keywords = BTreeMap::new();
        for (keyword, overrides) in &self.keywords {
            if keywords.contains_key(keyword) {
                return Err(MockError::InvalidSchema(format!(
                    "duplicate keyword '{keyword}' on schema '{}'",
                    self.name
                )));
            }
            for (field, kind) in overrides.entries() {
                if !index.contains_key(field) {
                    return Err(unknown(field));
                }
                kind.validate(field)?;
            }
            let order = if overrides.has_dependencies() {
                Some(graph_with(&self.fields, &overrides.effective())?.order().to_vec())
            } else {
                None
            };
            keywords.insert(
                keyword.clone(),
                Keyword {
                    overrides: overrides.clone(),
                    order,
                },
            );
        }

        for accessor in [&self.id, &self.name_accessor].into_iter().flatten() {
            if let Some(field) = accessor.field_name()
                && !index.contains_key(field)
            {
                return Err(unknown(field));
            }
        }

        let mut targets = BTreeSet::new();
        for action in &self.actions {
            if let Some(field) = action.effect.field() {
                if !index.contains_key(field) {
                    return Err(unknown(field));
                }
                targets.insert(field.to_string());
            }
        }

        debug!(
            schema = %self.name,
            fields = self.fields.len(),
            keywords = keywords.len(),
            actions = self.actions.len(),
            collections = targets.len(),
            "schema built"
        );

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                name: self.name,
                fields: self.fields,
                index,
                graph,
                keywords,
                id: self.id,
                name_accessor: self.name_accessor,
                actions: self.actions,
            }),
        })
    }
}
