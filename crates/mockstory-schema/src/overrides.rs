use std::collections::BTreeMap;

use mockstory_core::{GeneratorSpec, MockValue};

use crate::field::FieldKind;

/// Ordered field overrides, used for keyword presets and per-call tweaks.
///
/// Later entries win over earlier ones for the same field.
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    entries: Vec<(String, FieldKind)>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a field to a literal value.
    pub fn set(self, field: &str, value: impl Into<MockValue>) -> Self {
        self.rule(field, FieldKind::literal(value))
    }

    /// Swap the generator used for a field.
    pub fn generate(self, field: &str, spec: impl Into<GeneratorSpec>) -> Self {
        self.rule(field, FieldKind::generator(spec))
    }

    /// Replace the whole rule of a field, conditionals included.
    pub fn rule(mut self, field: &str, kind: impl Into<FieldKind>) -> Self {
        self.push(field, kind.into());
        self
    }

    pub fn push(&mut self, field: &str, kind: FieldKind) {
        self.entries.push((field.to_string(), kind));
    }

    pub fn entries(&self) -> &[(String, FieldKind)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when any override reads sibling fields.
    pub fn has_dependencies(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, kind)| !kind.dependencies().is_empty())
    }

    /// Entries of `self` followed by entries of `top`, so `top` wins.
    pub fn layered(&self, top: &OverrideSet) -> OverrideSet {
        let mut entries = self.entries.clone();
        entries.extend(top.entries.iter().cloned());
        OverrideSet { entries }
    }

    /// Last override per field.
    pub fn effective(&self) -> BTreeMap<&str, &FieldKind> {
        let mut effective = BTreeMap::new();
        for (field, kind) in &self.entries {
            effective.insert(field.as_str(), kind);
        }
        effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSource;

    fn literal_of(effective: &BTreeMap<&str, &FieldKind>, field: &str) -> MockValue {
        match effective.get(field) {
            Some(FieldKind::Leaf(FieldSource::Literal(value))) => value.clone(),
            other => panic!("expected literal for {field}, got {other:?}"),
        }
    }

    #[test]
    fn later_entries_win() {
        let overrides = OverrideSet::new()
            .set("status", "expired")
            .set("code", "A1")
            .set("status", "available");

        let effective = overrides.effective();
        assert_eq!(effective.len(), 2);
        assert_eq!(
            literal_of(&effective, "status"),
            MockValue::Text("available".into())
        );
    }

    #[test]
    fn layered_sets_put_top_last() {
        let keyword = OverrideSet::new().set("status", "expired").set("code", "K");
        let adhoc = OverrideSet::new().set("status", "available");

        let layered = keyword.layered(&adhoc);
        let effective = layered.effective();
        assert_eq!(
            literal_of(&effective, "status"),
            MockValue::Text("available".into())
        );
        assert_eq!(literal_of(&effective, "code"), MockValue::Text("K".into()));
        assert_eq!(keyword.entries().len(), 2);
    }
}
