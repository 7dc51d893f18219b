use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use mockstory_core::{MockValue, Record};
use mockstory_schema::{RelationAction, Schema, Trigger};

use crate::effects::{self, element_key, identity_accessor, value_key};
use crate::engine::{MockEngine, hash_seed};
use crate::errors::GenerationError;
use crate::instance::Instance;
use crate::mock::{Mock, MockRequest};

/// Something a story slot can be filled with.
#[derive(Debug, Clone)]
pub enum StoryEntry {
    /// Resolved when the story executes.
    Request(MockRequest),
    /// Used as is.
    Instance(Instance),
}

impl From<Schema> for StoryEntry {
    fn from(schema: Schema) -> Self {
        Self::Request(MockRequest::new(schema))
    }
}

impl From<&Schema> for StoryEntry {
    fn from(schema: &Schema) -> Self {
        Self::Request(MockRequest::new(schema.clone()))
    }
}

impl From<Mock<'_>> for StoryEntry {
    fn from(mock: Mock<'_>) -> Self {
        Self::Request(mock.into_request())
    }
}

impl From<MockRequest> for StoryEntry {
    fn from(request: MockRequest) -> Self {
        Self::Request(request)
    }
}

impl From<Instance> for StoryEntry {
    fn from(instance: Instance) -> Self {
        Self::Instance(instance)
    }
}

/// Collects story entries; see [`MockEngine::story`].
#[derive(Debug)]
pub struct StoryBuilder<'e> {
    engine: &'e MockEngine,
    entries: Vec<(Option<String>, StoryEntry)>,
    seed: Option<u64>,
}

impl<'e> StoryBuilder<'e> {
    pub(crate) fn new(engine: &'e MockEngine) -> Self {
        Self {
            engine,
            entries: Vec::new(),
            seed: None,
        }
    }

    pub fn add(mut self, slot: &str, entry: impl Into<StoryEntry>) -> Self {
        self.entries.push((Some(slot.to_string()), entry.into()));
        self
    }

    /// Add an entry whose slot comes from the resolved instance:
    /// its name, then its declared id, then its schema name.
    pub fn add_entry(mut self, entry: impl Into<StoryEntry>) -> Self {
        self.entries.push((None, entry.into()));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn exec(self) -> Result<Story, GenerationError> {
        let start = Instant::now();
        let story_seed = self.engine.seed_for(self.seed);
        info!(
            entries = self.entries.len(),
            seed = story_seed,
            "story started"
        );

        let mut story = Story::default();
        for (index, (slot, entry)) in self.entries.into_iter().enumerate() {
            let instance = match entry {
                StoryEntry::Instance(instance) => instance,
                StoryEntry::Request(request) => {
                    let seed = request.seed.unwrap_or_else(|| match &slot {
                        Some(slot) => hash_seed(story_seed, slot),
                        None => hash_seed(story_seed, &format!("#{index}")),
                    });
                    self.engine.resolve_request(&request, seed)?
                }
            };
            let slot = slot.unwrap_or_else(|| instance.default_slot());
            story.insert(&slot, instance)?;
        }

        info!(
            slots = story.len(),
            seed = story_seed,
            duration_ms = start.elapsed().as_millis() as u64,
            "story built"
        );
        Ok(story)
    }
}

/// Named instances plus the relation actions linking them.
///
/// Every mutation is transactional: on error the story is left exactly as
/// it was before the call.
#[derive(Debug, Clone, Default)]
pub struct Story {
    slots: Vec<String>,
    instances: BTreeMap<String, Instance>,
    schemas: BTreeMap<String, Schema>,
}

impl Story {
    /// Track a new instance under `slot`.
    pub fn insert(&mut self, slot: &str, instance: Instance) -> Result<(), GenerationError> {
        if self.instances.contains_key(slot) {
            return Err(GenerationError::DuplicateSlot(slot.to_string()));
        }
        self.schemas
            .entry(instance.schema_name().to_string())
            .or_insert_with(|| instance.schema().clone());
        self.slots.push(slot.to_string());
        self.instances.insert(slot.to_string(), instance);
        Ok(())
    }

    pub fn get(&self, slot: &str) -> Option<&Instance> {
        self.instances.get(slot)
    }

    pub fn instance(&self, slot: &str) -> Result<&Instance, GenerationError> {
        self.get(slot)
            .ok_or_else(|| GenerationError::UnknownSlot(slot.to_string()))
    }

    /// Slots in insertion order.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.slots
            .iter()
            .filter_map(|slot| Some((slot.as_str(), self.instances.get(slot)?)))
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (slot, instance) in self.iter() {
            map.insert(slot.to_string(), instance.to_json());
        }
        Value::Object(map)
    }

    /// Run every `trigger` action `owner` declares for `related`'s schema.
    ///
    /// Returns the number of actions applied.
    pub fn dispatch(
        &mut self,
        owner: &str,
        trigger: impl Into<Trigger>,
        related: &str,
    ) -> Result<usize, GenerationError> {
        let trigger = trigger.into();
        self.transact("dispatch", |story| {
            let applied = story.apply_actions(owner, &trigger, related, None)?;
            if applied == 0 {
                let schema = story.instance(related)?.schema_name().to_string();
                return Err(GenerationError::NoMatchingAction {
                    owner: story.instance(owner)?.schema_name().to_string(),
                    trigger: trigger.to_string(),
                    related: schema,
                });
            }
            Ok((applied, vec![owner.to_string()]))
        })
    }

    pub fn add_to(&mut self, owner: &str, related: &str) -> Result<usize, GenerationError> {
        self.dispatch(owner, Trigger::Add, related)
    }

    pub fn remove_from(&mut self, owner: &str, related: &str) -> Result<usize, GenerationError> {
        self.dispatch(owner, Trigger::Remove, related)
    }

    pub fn change_in(&mut self, owner: &str, related: &str) -> Result<usize, GenerationError> {
        self.dispatch(owner, Trigger::Change, related)
    }

    /// Set one field and propagate the change to every owner holding the
    /// instance.
    pub fn update(
        &mut self,
        slot: &str,
        field: &str,
        value: impl Into<MockValue>,
    ) -> Result<(), GenerationError> {
        let value = value.into();
        self.transact("update", |story| {
            let holders = story.holders(slot)?;
            let instance = story
                .instances
                .get_mut(slot)
                .ok_or_else(|| GenerationError::UnknownSlot(slot.to_string()))?;
            let previous = instance.values().clone();
            instance.set(field, value)?;

            for holder in &holders {
                story.apply_actions(holder, &Trigger::Change, slot, Some(&previous))?;
            }
            Ok(((), holders))
        })
    }

    /// Detach the instance from every owner holding it, then drop it.
    pub fn remove(&mut self, slot: &str) -> Result<Instance, GenerationError> {
        self.transact("remove", |story| {
            let holders = story.holders(slot)?;
            for holder in &holders {
                story.apply_actions(holder, &Trigger::Remove, slot, None)?;
            }
            let instance = story
                .instances
                .remove(slot)
                .ok_or_else(|| GenerationError::UnknownSlot(slot.to_string()))?;
            story.slots.retain(|existing| existing != slot);
            Ok((instance, holders))
        })
    }

    /// Run `operation`, then check the owners it touched. Any error restores
    /// the previous state.
    fn transact<T>(
        &mut self,
        operation: &str,
        operation_fn: impl FnOnce(&mut Story) -> Result<(T, Vec<String>), GenerationError>,
    ) -> Result<T, GenerationError> {
        let snapshot = self.clone();
        let result = operation_fn(self).and_then(|(value, touched)| {
            self.check_integrity(&touched)?;
            Ok(value)
        });
        if let Err(err) = &result {
            warn!(operation, error = %err, "story mutation rolled back");
            *self = snapshot;
        }
        result
    }

    fn apply_actions(
        &mut self,
        owner: &str,
        trigger: &Trigger,
        related: &str,
        previous: Option<&Record>,
    ) -> Result<usize, GenerationError> {
        let related_instance = self.instance(related)?;
        let related_schema = related_instance.schema().clone();
        let related_values = related_instance.values().clone();
        let owner_schema = self.instance(owner)?.schema().clone();
        let actions: Vec<RelationAction> = owner_schema
            .actions_for(trigger, related_schema.name())
            .into_iter()
            .cloned()
            .collect();

        let owner_instance = self
            .instances
            .get_mut(owner)
            .ok_or_else(|| GenerationError::UnknownSlot(owner.to_string()))?;
        for action in &actions {
            debug!(
                owner,
                related,
                trigger = %trigger,
                effect = action.effect.label(),
                "applying action"
            );
            effects::apply(
                action,
                owner_schema.name(),
                owner_instance.values_mut(),
                &related_schema,
                &related_values,
                previous,
            )?;
        }
        owner_instance.refresh_identity();
        Ok(actions.len())
    }

    /// Slots whose action-managed collections contain the instance at `slot`.
    fn holders(&self, slot: &str) -> Result<Vec<String>, GenerationError> {
        let target = self.instance(slot)?;
        let mut holders = Vec::new();
        for (owner_slot, owner) in self.iter() {
            if owner_slot == slot {
                continue;
            }
            let holds = owner
                .schema()
                .actions()
                .iter()
                .filter(|action| action.related == target.schema_name())
                .any(|action| collection_holds(owner.values(), action, target));
            if holds {
                holders.push(owner_slot.to_string());
            }
        }
        Ok(holders)
    }

    /// Every keyed element of the touched owners' collections must point at a
    /// tracked instance of its schema.
    fn check_integrity(&self, owners: &[String]) -> Result<(), GenerationError> {
        for owner_slot in owners {
            let Some(owner) = self.instances.get(owner_slot) else {
                continue;
            };
            for action in owner.schema().actions() {
                let Some(field) = action.effect.field() else {
                    continue;
                };
                let Some(related_schema) = self.schemas.get(&action.related) else {
                    continue;
                };
                let Some(accessor) = identity_accessor(action, related_schema) else {
                    continue;
                };
                let Some(items) = owner.get(field).and_then(MockValue::as_list) else {
                    continue;
                };
                for key in items.iter().filter_map(|item| element_key(accessor, item)) {
                    let tracked = self.instances.values().any(|instance| {
                        instance.schema_name() == action.related
                            && accessor
                                .get(instance.values())
                                .is_some_and(|id| value_key(&id) == key)
                    });
                    if !tracked {
                        return Err(GenerationError::ReferentialIntegrity(format!(
                            "'{owner_slot}.{field}' references {} '{key}' which is not in the story",
                            action.related
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn collection_holds(owner: &Record, action: &RelationAction, target: &Instance) -> bool {
    let Some(items) = action
        .effect
        .field()
        .and_then(|field| owner.get(field))
        .and_then(MockValue::as_list)
    else {
        return false;
    };
    match identity_accessor(action, target.schema()) {
        Some(accessor) => match accessor.get(target.values()) {
            Some(id) => {
                let key = value_key(&id);
                items
                    .iter()
                    .any(|item| element_key(accessor, item).as_deref() == Some(key.as_str()))
            }
            None => false,
        },
        None => {
            let element = MockValue::Record(target.values().clone());
            items.contains(&element)
        }
    }
}
