use mockstory_core::{MockError, MockValue, Record};
use mockstory_schema::{Accessor, Effect, RelationAction, Schema};

use crate::errors::GenerationError;

/// Accessor used to identify related records for `action`.
///
/// The action's own accessor wins over the related schema's.
pub(crate) fn identity_accessor<'a>(
    action: &'a RelationAction,
    related: &'a Schema,
) -> Option<&'a Accessor> {
    action.id.as_ref().or_else(|| related.id_accessor())
}

/// Apply one action to the owner's values.
///
/// `previous` holds the related values before a change; id matching uses it
/// so an update can follow a record whose id field was rewritten.
pub(crate) fn apply(
    action: &RelationAction,
    owner_schema: &str,
    owner: &mut Record,
    related_schema: &Schema,
    related: &Record,
    previous: Option<&Record>,
) -> Result<(), GenerationError> {
    let identity = if action.effect.needs_identity() {
        let accessor = identity_accessor(action, related_schema).ok_or_else(|| {
            MockError::MissingIdAccessor {
                schema: owner_schema.to_string(),
                related: related_schema.name().to_string(),
            }
        })?;
        let key = accessor
            .get(previous.unwrap_or(related))
            .map(|id| value_key(&id))
            .ok_or_else(|| GenerationError::InvalidCollection {
                field: action.effect.field().unwrap_or_default().to_string(),
                reason: format!("related '{}' record has no id", related_schema.name()),
            })?;
        Some((accessor, key))
    } else {
        None
    };
    let matches = |element: &MockValue| match &identity {
        Some((accessor, key)) => element_key(accessor, element).as_deref() == Some(key.as_str()),
        None => false,
    };
    let element = MockValue::Record(related.clone());

    match &action.effect {
        Effect::Push { field } => list_mut(owner, field)?.push(element),
        Effect::Delete { field } => list_mut(owner, field)?.retain(|item| !matches(item)),
        Effect::Upsert { field } => {
            let items = list_mut(owner, field)?;
            match items.iter().position(|item| matches(item)) {
                Some(position) => items[position] = element,
                None => items.push(element),
            }
        }
        Effect::Update { field } => {
            for item in list_mut(owner, field)?.iter_mut() {
                if matches(item) {
                    *item = element.clone();
                }
            }
        }
        Effect::Empty { field } => list_mut(owner, field)?.clear(),
        Effect::Custom(effect) => effect(owner, related),
    }
    Ok(())
}

/// Identity key of a collection element, when it carries one.
pub(crate) fn element_key(accessor: &Accessor, element: &MockValue) -> Option<String> {
    element
        .as_record()
        .and_then(|record| accessor.get(record))
        .map(|id| value_key(&id))
}

fn list_mut<'a>(owner: &'a mut Record, field: &str) -> Result<&'a mut Vec<MockValue>, GenerationError> {
    let slot = owner.entry(field.to_string()).or_insert(MockValue::Null);
    if slot.is_null() {
        *slot = MockValue::List(Vec::new());
    }
    match slot {
        MockValue::List(items) => Ok(items),
        other => Err(GenerationError::InvalidCollection {
            field: field.to_string(),
            reason: format!("expected a list, found {}", other.to_json()),
        }),
    }
}

/// Stable textual key for comparing identities and naming slots.
pub(crate) fn value_key(value: &MockValue) -> String {
    match value {
        MockValue::Null => "<null>".to_string(),
        MockValue::Bool(value) => value.to_string(),
        MockValue::Int(value) => value.to_string(),
        MockValue::Float(value) => value.to_string(),
        MockValue::Text(value) | MockValue::Uuid(value) => value.clone(),
        MockValue::Date(value) => value.format("%Y-%m-%d").to_string(),
        MockValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        MockValue::List(_) | MockValue::Record(_) => value.to_json().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockstory_core::generator::uuid;
    use mockstory_schema::Trigger;

    fn coupon_schema() -> Schema {
        Schema::builder("coupon")
            .field("code", uuid())
            .id("code")
            .build()
            .expect("coupon schema")
    }

    fn coupon(code: &str, discount: i64) -> Record {
        let mut record = Record::new();
        record.insert("code".to_string(), MockValue::Text(code.to_string()));
        record.insert("discount".to_string(), MockValue::Int(discount));
        record
    }

    fn action(effect: Effect) -> RelationAction {
        RelationAction {
            trigger: Trigger::Add,
            related: "coupon".to_string(),
            id: None,
            effect,
        }
    }

    fn coupons(owner: &Record) -> Vec<String> {
        owner
            .get("coupons")
            .and_then(MockValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|item| item.as_record()?.get("code")?.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn push_then_delete_by_id() {
        let schema = coupon_schema();
        let push = action(Effect::Push {
            field: "coupons".to_string(),
        });
        let delete = action(Effect::Delete {
            field: "coupons".to_string(),
        });
        let mut owner = Record::new();

        for code in ["A", "B", "C"] {
            apply(&push, "user", &mut owner, &schema, &coupon(code, 5), None).expect("push");
        }
        apply(&delete, "user", &mut owner, &schema, &coupon("B", 5), None).expect("delete");

        assert_eq!(coupons(&owner), ["A", "C"]);
    }

    #[test]
    fn upsert_replaces_matching_element() {
        let schema = coupon_schema();
        let upsert = action(Effect::Upsert {
            field: "coupons".to_string(),
        });
        let mut owner = Record::new();

        apply(&upsert, "user", &mut owner, &schema, &coupon("A", 5), None).expect("insert");
        apply(&upsert, "user", &mut owner, &schema, &coupon("A", 9), None).expect("replace");

        let items = owner.get("coupons").and_then(MockValue::as_list).expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_record().and_then(|record| record.get("discount")),
            Some(&MockValue::Int(9))
        );
    }

    #[test]
    fn delete_without_any_accessor_fails() {
        let schema = Schema::builder("coupon")
            .field("code", uuid())
            .build()
            .expect("schema without id");
        let delete = action(Effect::Delete {
            field: "coupons".to_string(),
        });
        let mut owner = Record::new();

        let result = apply(&delete, "user", &mut owner, &schema, &coupon("A", 5), None);
        assert!(matches!(
            result,
            Err(GenerationError::Mock(MockError::MissingIdAccessor { .. }))
        ));
    }

    #[test]
    fn action_accessor_overrides_schema_accessor() {
        let schema = coupon_schema();
        let mut delete = action(Effect::Delete {
            field: "coupons".to_string(),
        });
        delete.id = Some(Accessor::field("discount"));

        let mut owner = Record::new();
        owner.insert(
            "coupons".to_string(),
            MockValue::List(vec![
                MockValue::Record(coupon("A", 5)),
                MockValue::Record(coupon("B", 7)),
            ]),
        );

        apply(&delete, "user", &mut owner, &schema, &coupon("Z", 7), None).expect("delete");
        assert_eq!(coupons(&owner), ["A"]);
    }

    #[test]
    fn non_list_target_is_rejected() {
        let schema = coupon_schema();
        let push = action(Effect::Push {
            field: "coupons".to_string(),
        });
        let mut owner = Record::new();
        owner.insert("coupons".to_string(), MockValue::Int(3));

        let result = apply(&push, "user", &mut owner, &schema, &coupon("A", 5), None);
        assert!(matches!(result, Err(GenerationError::InvalidCollection { .. })));
    }
}
