use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{MockError, Result};

/// Summary of field graph structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Acyclic dependency graph over the fields of one schema.
///
/// The evaluation order is computed once, at construction. Fields with no
/// dependency relationship keep their declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    declared: Vec<String>,
    edges: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl DependencyGraph {
    /// Build the graph from `(field, dependencies)` pairs in declaration order.
    pub fn build<I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, BTreeSet<String>)>,
    {
        let mut declared = Vec::new();
        let mut edges = BTreeMap::new();

        for (field, dependencies) in fields {
            if edges.contains_key(&field) {
                return Err(MockError::InvalidSchema(format!(
                    "duplicate field name: {field}"
                )));
            }
            declared.push(field.clone());
            edges.insert(field, dependencies);
        }

        for (field, dependencies) in &edges {
            for dependency in dependencies {
                if !edges.contains_key(dependency) {
                    return Err(MockError::InvalidSchema(format!(
                        "field '{field}' depends on unknown field '{dependency}'"
                    )));
                }
            }
        }

        let order = toposort(&declared, &edges)?;
        Ok(Self {
            declared,
            edges,
            order,
        })
    }

    /// Evaluation order: every field after all of its dependencies.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Fields in declaration order.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    pub fn dependencies(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(field)
    }

    /// Fields reading `field` directly.
    pub fn dependents(&self, field: &str) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|candidate| {
                self.edges
                    .get(candidate.as_str())
                    .is_some_and(|dependencies| dependencies.contains(field))
            })
            .map(String::as_str)
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.declared.len(),
            edges: self.edges.values().map(BTreeSet::len).sum(),
        }
    }
}

fn toposort(
    declared: &[String],
    edges: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>> {
    let position: BTreeMap<&str, usize> = declared
        .iter()
        .enumerate()
        .map(|(index, field)| (field.as_str(), index))
        .collect();
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut order = Vec::with_capacity(declared.len());

    for field in declared {
        visit(field, edges, &position, &mut marks, &mut stack, &mut order)?;
    }

    Ok(order)
}

fn visit<'a>(
    field: &'a str,
    edges: &'a BTreeMap<String, BTreeSet<String>>,
    position: &BTreeMap<&str, usize>,
    marks: &mut BTreeMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    match marks.get(field) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Active) => {
            let start = stack
                .iter()
                .position(|entry| *entry == field)
                .unwrap_or_default();
            let fields = stack[start..]
                .iter()
                .map(|entry| entry.to_string())
                .collect();
            return Err(MockError::Cycle { fields });
        }
        None => {}
    }

    marks.insert(field, Mark::Active);
    stack.push(field);

    let mut dependencies: Vec<&'a str> = edges
        .get(field)
        .map(|dependencies| dependencies.iter().map(String::as_str).collect())
        .unwrap_or_default();
    dependencies.sort_by_key(|dependency| position.get(dependency).copied().unwrap_or(usize::MAX));

    for dependency in dependencies {
        visit(dependency, edges, position, marks, stack, order)?;
    }

    stack.pop();
    marks.insert(field, Mark::Done);
    order.push(field.to_string());
    Ok(())
}
